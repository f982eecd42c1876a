use std::io::{self, BufRead, Write};
use std::time::Duration;

use chrono::Local;
use clap::Args;
use kirana_core::MerchantRegistry;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::commands::{merchants, CommandResult};

/// Simulated WhatsApp customer used when no sender is given.
const DEFAULT_SENDER: &str = "+919876543210";

const API_KEY_HEADER: &str = "x-api-key";
const AGENT_ID_HEADER: &str = "x-agent-id";

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, help = "Merchant to chat with (defaults to the first demo merchant)")]
    pub merchant: Option<String>,
    #[arg(long, default_value = DEFAULT_SENDER, help = "Simulated customer phone number")]
    pub sender: String,
    #[arg(long, help = "Agent platform API key, sent as x-api-key on every message")]
    pub api_key: Option<String>,
    #[arg(long, help = "Existing external agent id, sent as x-agent-id")]
    pub agent_id: Option<String>,
    #[arg(long, default_value = "http://127.0.0.1:8000", help = "Chat gateway base URL")]
    pub gateway: String,
    #[arg(long, help = "Print the raw gateway payload after each reply")]
    pub raw: bool,
}

struct ChatSession {
    merchant_id: String,
    sender: String,
    api_key: Option<String>,
    agent_id: Option<String>,
    gateway: String,
    raw: bool,
    exchanges: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Message(&'a str),
    SwitchMerchant(&'a str),
    ListMerchants,
    ShowCatalog,
    ToggleRaw,
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
enum SendError {
    Unreachable { gateway: String },
    Transport { detail: String },
    Gateway { status: u16, detail: String },
}

pub fn run(args: ChatArgs) -> CommandResult {
    let registry = MerchantRegistry::with_fixtures();

    let merchant_id = match args.merchant {
        Some(id) => id,
        None => match registry.iter().next() {
            Some(profile) => profile.id.clone(),
            None => {
                return CommandResult::failure(
                    "chat",
                    "empty_registry",
                    "no demo merchants available",
                    2,
                )
            }
        },
    };
    if registry.get(&merchant_id).is_none() {
        return CommandResult::failure(
            "chat",
            "unknown_merchant",
            format!("merchant `{merchant_id}` is not in the demo registry; run `kirana merchants`"),
            2,
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        }
    };
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(15)).build() {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "http_client",
                format!("failed to build http client: {error}"),
                3,
            )
        }
    };

    let mut session = ChatSession {
        merchant_id,
        sender: args.sender,
        api_key: args.api_key,
        agent_id: args.agent_id,
        gateway: args.gateway.trim_end_matches('/').to_string(),
        raw: args.raw,
        exchanges: 0,
    };

    greet(&registry, &session);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        prompt(&session.sender);
        let Some(line) = lines.next() else { break };
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                return CommandResult::failure(
                    "chat",
                    "stdin",
                    format!("failed to read input: {error}"),
                    3,
                )
            }
        };

        match parse_directive(&line) {
            Directive::Empty => {}
            Directive::Quit => break,
            Directive::Help => println!("{}", help_text()),
            Directive::ListMerchants => println!("{}", merchants::run()),
            Directive::ShowCatalog => {
                if let Some(merchant) = registry.get(&session.merchant_id) {
                    println!("{}", merchants::render_merchant(merchant));
                }
            }
            Directive::ToggleRaw => {
                session.raw = !session.raw;
                println!("raw payload output {}", if session.raw { "on" } else { "off" });
            }
            Directive::SwitchMerchant(id) => match registry.get(id) {
                Some(merchant) => {
                    session.merchant_id = merchant.id.clone();
                    println!(
                        "now chatting with {} {} (fresh conversation)",
                        merchant.emoji, merchant.name
                    );
                }
                None => println!("unknown merchant `{id}`; try :merchants"),
            },
            Directive::Unknown(directive) => {
                println!("unknown directive `{directive}`; type :help");
            }
            Directive::Message(text) => match send_message(&runtime, &client, &session, text) {
                Ok(payload) => {
                    session.exchanges += 1;
                    print_reply(&registry, &session, &payload);
                }
                Err(error) => println!("{}", describe_send_error(&error)),
            },
        }
    }

    CommandResult::success(
        "chat",
        format!("chat session ended after {} exchange(s)", session.exchanges),
    )
}

fn greet(registry: &MerchantRegistry, session: &ChatSession) {
    println!("{}", merchant_label(registry, &session.merchant_id));
    println!(
        "Simulating customer {} ordering on WhatsApp via {}.",
        session.sender, session.gateway
    );
    if session.api_key.is_none() {
        println!("note: no --api-key given; the gateway must hold a default credential");
    }
    println!("Type a message and press enter; :help lists directives.");
}

fn prompt(sender: &str) {
    print!("{sender}> ");
    let _ = io::stdout().flush();
}

fn help_text() -> &'static str {
    ":merchant <id>  switch merchant (fresh conversation)\n\
     :merchants      list demo merchants\n\
     :catalog        show the active merchant's catalog\n\
     :raw            toggle raw gateway payload output\n\
     :help           this text\n\
     :quit           end the session"
}

fn parse_directive(line: &str) -> Directive<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Directive::Empty;
    }

    let Some(rest) = trimmed.strip_prefix(':') else {
        return Directive::Message(trimmed);
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("") {
        "merchant" => match parts.next().map(str::trim).filter(|value| !value.is_empty()) {
            Some(id) => Directive::SwitchMerchant(id),
            None => Directive::Unknown(trimmed),
        },
        "merchants" => Directive::ListMerchants,
        "catalog" => Directive::ShowCatalog,
        "raw" => Directive::ToggleRaw,
        "help" => Directive::Help,
        "quit" | "q" | "exit" => Directive::Quit,
        _ => Directive::Unknown(trimmed),
    }
}

fn send_message(
    runtime: &Runtime,
    client: &reqwest::Client,
    session: &ChatSession,
    message: &str,
) -> Result<Value, SendError> {
    runtime.block_on(async {
        let mut request = client.post(format!("{}/chat", session.gateway)).json(&serde_json::json!({
            "merchant_id": session.merchant_id,
            "sender": session.sender,
            "message": message,
        }));
        if let Some(api_key) = &session.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }
        if let Some(agent_id) = &session.agent_id {
            request = request.header(AGENT_ID_HEADER, agent_id);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_connect() {
                SendError::Unreachable { gateway: session.gateway.clone() }
            } else {
                SendError::Transport { detail: error.to_string() }
            }
        })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let detail = body["detail"].as_str().unwrap_or("no detail provided").to_string();
            return Err(SendError::Gateway { status: status.as_u16(), detail });
        }
        Ok(body)
    })
}

fn describe_send_error(error: &SendError) -> String {
    match error {
        SendError::Unreachable { gateway } => format!(
            "Cannot reach the kirana gateway at {gateway}. Start it with `kirana-server` and try again."
        ),
        SendError::Transport { detail } => format!("Request to the gateway failed: {detail}"),
        SendError::Gateway { status, detail } => {
            format!("Gateway reached, but the exchange failed ({status}): {detail}")
        }
    }
}

fn print_reply(registry: &MerchantRegistry, session: &ChatSession, payload: &Value) {
    let reply = payload["reply"].as_str().unwrap_or("<no reply text>");
    let stamp = Local::now().format("%H:%M");
    println!("[{stamp}] {}: {reply}", merchant_label(registry, &session.merchant_id));

    if session.raw {
        println!(
            "{}",
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
        );
    }
}

fn merchant_label(registry: &MerchantRegistry, merchant_id: &str) -> String {
    registry
        .get(merchant_id)
        .map(|merchant| format!("{} {}", merchant.emoji, merchant.name))
        .unwrap_or_else(|| merchant_id.to_string())
}

#[cfg(test)]
mod tests {
    use crate::commands::chat::{describe_send_error, parse_directive, Directive, SendError};

    #[test]
    fn plain_text_lines_are_messages() {
        assert_eq!(parse_directive("Show me your cakes"), Directive::Message("Show me your cakes"));
        assert_eq!(parse_directive("  padded  "), Directive::Message("padded"));
        assert_eq!(parse_directive("   "), Directive::Empty);
    }

    #[test]
    fn directives_parse_with_and_without_arguments() {
        assert_eq!(
            parse_directive(":merchant merchant_002"),
            Directive::SwitchMerchant("merchant_002")
        );
        assert_eq!(parse_directive(":merchants"), Directive::ListMerchants);
        assert_eq!(parse_directive(":catalog"), Directive::ShowCatalog);
        assert_eq!(parse_directive(":raw"), Directive::ToggleRaw);
        assert_eq!(parse_directive(":help"), Directive::Help);
        assert_eq!(parse_directive(":quit"), Directive::Quit);
        assert_eq!(parse_directive(":q"), Directive::Quit);
    }

    #[test]
    fn merchant_directive_without_id_is_rejected() {
        assert_eq!(parse_directive(":merchant"), Directive::Unknown(":merchant"));
        assert_eq!(parse_directive(":merchant   "), Directive::Unknown(":merchant"));
        assert_eq!(parse_directive(":bogus"), Directive::Unknown(":bogus"));
    }

    #[test]
    fn unreachable_gateway_guidance_tells_the_operator_to_start_the_server() {
        let message = describe_send_error(&SendError::Unreachable {
            gateway: "http://127.0.0.1:8000".to_string(),
        });
        assert!(message.contains("Cannot reach the kirana gateway"));
        assert!(message.contains("kirana-server"));
    }

    #[test]
    fn gateway_errors_surface_the_detail_and_status() {
        let message = describe_send_error(&SendError::Gateway {
            status: 404,
            detail: "Merchant 'ghost_merchant' not found".to_string(),
        });
        assert!(message.contains("Gateway reached"));
        assert!(message.contains("404"));
        assert!(message.contains("ghost_merchant"));

        let transport =
            describe_send_error(&SendError::Transport { detail: "timeout".to_string() });
        assert!(transport.contains("Request to the gateway failed"));
    }
}
