use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Add { url: String, target_price: Decimal },
    List,
    Remove { url: String },
    Unknown(String),
}

/// Malformed user input. The message is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Wrong format. Use: /add <link> <price>")]
    AddUsage,

    #[error("Wrong format. Use: /remove <link>")]
    RemoveUsage,

    #[error("The price must be a positive number.")]
    InvalidPrice,

    #[error("The link must be an http:// or https:// URL.")]
    InvalidUrl,
}

/// Parse a chat message. Returns `None` when the text is not a command at all.
pub fn parse_command(text: &str) -> Option<Result<Command, CommandError>> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // Group chats address commands as /add@SomeBot
    let name = head.split('@').next().unwrap_or(head).to_lowercase();

    let command = match name.as_str() {
        "start" | "help" => Ok(Command::Start),
        "list" => Ok(Command::List),
        "add" => parse_add(args),
        "remove" => parse_remove(args),
        _ => Ok(Command::Unknown(name)),
    };
    Some(command)
}

fn parse_add(args: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [url, price] = parts.as_slice() else {
        return Err(CommandError::AddUsage);
    };

    Ok(Command::Add {
        url: parse_url(url)?,
        target_price: parse_price(price)?,
    })
}

fn parse_remove(args: &str) -> Result<Command, CommandError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [url] = parts.as_slice() else {
        return Err(CommandError::RemoveUsage);
    };

    Ok(Command::Remove { url: parse_url(url)? })
}

fn parse_url(raw: &str) -> Result<String, CommandError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(raw.to_string()),
        _ => Err(CommandError::InvalidUrl),
    }
}

fn parse_price(raw: &str) -> Result<Decimal, CommandError> {
    let price = Decimal::from_str(&raw.replace(',', ".")).map_err(|_| CommandError::InvalidPrice)?;
    if price <= Decimal::ZERO {
        return Err(CommandError::InvalidPrice);
    }
    Ok(price)
}
