//! Diagram generator: stream a Mermaid answer, then pull the code block out.

use crate::error::{AppError, Result};
use crate::extract::{extract_fenced_block, ExtractionResult};
use crate::providers::ChatMessage;
use crate::CompletionClient;

pub const MERMAID_TAG: &str = "mermaid";

pub const NOT_FOUND_MESSAGE: &str = "No Mermaid diagram code found in the response.";

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a description for your diagram.";

/// What the model is told to say for off-topic requests.
pub const REFUSAL_MESSAGE: &str = "I can only generate software and technical diagrams. Please describe a software architecture, flowchart, sequence diagram, or other technical diagram you'd like me to create.";

pub const DIAGRAM_SYSTEM_PROMPT: &str = r#"You are a software diagram expert that generates Mermaid diagram code.

IMPORTANT RULES:
1. You ONLY create software-related diagrams including:
   - Software architecture diagrams
   - System design diagrams
   - Flowcharts for algorithms/processes
   - Sequence diagrams
   - Class diagrams
   - Entity-Relationship diagrams (ERD)
   - State diagrams
   - Component diagrams
   - Deployment diagrams
   - API flow diagrams
   - Database schemas
   - Network architecture diagrams

2. You must REFUSE any request that is NOT related to software/technical diagrams. This includes:
   - General artwork or illustrations
   - Photos or realistic images
   - Non-technical diagrams
   - Any image generation that isn't a software/technical diagram

   For refused requests, respond with: "I can only generate software and technical diagrams. Please describe a software architecture, flowchart, sequence diagram, or other technical diagram you'd like me to create."

3. Always output valid Mermaid syntax wrapped in ```mermaid code blocks.

4. After the diagram code, provide a brief explanation of the diagram components.

5. Keep diagrams clean and readable - don't overcomplicate them.
"#;

/// Sample requests offered next to the prompt box.
pub const EXAMPLE_PROMPTS: &[(&str, &str)] = &[
    ("Architecture", "Create a microservices architecture for an e-commerce platform with API gateway, user service, product service, order service, and database"),
    ("Sequence", "Show the OAuth 2.0 authorization code flow between user, client app, auth server, and resource server"),
    ("Flowchart", "Create a flowchart for a CI/CD pipeline with build, test, staging deployment, and production deployment stages"),
    ("ERD", "Design a database schema for a blog platform with users, posts, comments, and tags"),
    ("Class", "Create a class diagram for a payment processing system with Payment, CreditCard, PayPal, and Transaction classes"),
];

pub fn diagram_messages(prompt: &str) -> Result<Vec<ChatMessage>> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput(EMPTY_PROMPT_MESSAGE.to_string()));
    }
    Ok(vec![ChatMessage::system(DIAGRAM_SYSTEM_PROMPT), ChatMessage::user(prompt)])
}

pub fn extract_mermaid(text: &str) -> ExtractionResult<String> {
    extract_fenced_block(text, MERMAID_TAG)
}

/// A finished diagram turn: the full explanation plus whatever Mermaid
/// source could be extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramOutput {
    pub response: String,
    pub diagram: ExtractionResult<String>,
}

impl DiagramOutput {
    pub fn from_response(response: String) -> Self {
        let diagram = extract_mermaid(&response);
        if !diagram.is_found() {
            tracing::info!(bytes = response.len(), "no mermaid block in response");
        }
        Self { response, diagram }
    }

    /// The model declined an off-topic request.
    pub fn is_refusal(&self) -> bool {
        !self.diagram.is_found() && self.response.contains("I can only generate software and technical diagrams")
    }
}

/// Stream a diagram answer for `prompt`, reporting snapshots as they arrive.
pub async fn generate_diagram<F>(
    client: &CompletionClient,
    model: &str,
    prompt: &str,
    on_snapshot: F,
) -> Result<DiagramOutput>
where
    F: FnMut(&str),
{
    let messages = diagram_messages(prompt)?;
    let response = client.stream_chat(model, &messages, on_snapshot).await?;
    Ok(DiagramOutput::from_response(response))
}
