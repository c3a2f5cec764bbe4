use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;

use salesintel_agent::{AgentContext, ChatResponse, QueryAgent};
use salesintel_core::config::Settings;
use salesintel_core::types::DocumentType;
use salesintel_core::Error;
use salesintel_query::{QueryValidator, Verdict};

use crate::wiring::{chat_client, open_executor, open_vector_store};

/// Knowledge-base options for `chat`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatOptions<'a> {
    pub rag: bool,
    pub doc_type: Option<&'a str>,
}

pub fn validate(settings: &Settings, query: &str) -> Result<()> {
    let validator = QueryValidator::new(&settings.agent.allowed_entities, settings.agent.max_query_chars)?;
    match validator.validate(query) {
        Verdict::Safe => println!("SAFE"),
        Verdict::Rejected(reason) => println!("REJECTED ({})", reason.code()),
    }
    Ok(())
}

fn print_response(resp: &ChatResponse) {
    println!("\n{}", resp.answer);
    if let Some(query) = &resp.query {
        println!("\n  query: {query}");
    }
    if let Some(rows) = &resp.data {
        println!("  rows: {}", rows.len());
    }
}

async fn ask(
    agent: &QueryAgent,
    message: &str,
    conversation: Option<&str>,
    rag: Option<Option<DocumentType>>,
) -> salesintel_core::Result<ChatResponse> {
    match rag {
        Some(document_type) => agent.process_message_with_context(message, conversation, document_type).await,
        None => agent.process_message(message, conversation).await,
    }
}

pub async fn chat(settings: &Settings, message: Option<&str>, conversation: Option<&str>, opts: ChatOptions<'_>) -> Result<()> {
    let context = Arc::new(AgentContext::new(settings.agent.history_window));
    let mut agent = QueryAgent::from_settings(context, chat_client(settings)?, open_executor(settings)?, &settings.agent)?;
    let rag = if opts.rag {
        let document_type: Option<DocumentType> = opts.doc_type.map(str::parse).transpose()?;
        agent = agent.with_knowledge(open_vector_store(settings).await?, settings.vector.context_token_budget);
        tracing::info!(doc_type = ?document_type, budget = settings.vector.context_token_budget, "knowledge-base context enabled");
        Some(document_type)
    } else {
        None
    };

    if let Some(message) = message {
        let resp = ask(&agent, message, conversation, rag).await?;
        print_response(&resp);
        println!("  conversation: {}", resp.conversation_id);
        return Ok(());
    }

    let mut conversation_id = conversation.map(str::to_string);
    println!("💬 Ask about your sales, leads, campaigns or customers. Empty line to quit.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        match ask(&agent, line.trim(), conversation_id.as_deref(), rag).await {
            Ok(resp) => {
                print_response(&resp);
                conversation_id = Some(resp.conversation_id);
            }
            Err(e @ Error::Translation { .. }) | Err(e @ Error::Oracle(_)) => println!("\n{e}"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
