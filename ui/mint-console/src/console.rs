//! Line commands and plain-text rendering.

use std::fmt::Write as _;

use mp_api_types::{MintStatus, format_ether};

use crate::app::{ConnectTarget, MintApp};

pub const HELP: &str = "\
commands:
  status            sale stats and wallet
  wallets           discovered wallets
  connect [n|qr]    connect wallet n (default: first) or pair by QR
  disconnect        drop the wallet session
  mint [n]          mint n tokens (default 1)
  recent            latest mints
  gallery           reveal the next page of images
  log               full activity log
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Wallets,
    Connect(ConnectTarget),
    Disconnect,
    Mint(String),
    Recent,
    Gallery,
    Log,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Empty;
    };
    let arg = words.next();

    match head.to_ascii_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "status" => Command::Status,
        "wallets" => Command::Wallets,
        "connect" => match arg {
            Some(arg) if arg.eq_ignore_ascii_case("qr") => Command::Connect(ConnectTarget::RemotePairing),
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Connect(ConnectTarget::Injected(Some(n - 1))),
                _ => Command::Unknown(line.trim().to_owned()),
            },
            None => Command::Connect(ConnectTarget::Injected(None)),
        },
        "disconnect" => Command::Disconnect,
        "mint" => Command::Mint(arg.unwrap_or("1").to_owned()),
        "recent" => Command::Recent,
        "gallery" | "more" => Command::Gallery,
        "log" => Command::Log,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.trim().to_owned()),
    }
}

pub struct Outcome {
    pub output: String,
    pub quit: bool,
}

impl Outcome {
    fn show(output: String) -> Self {
        Self { output, quit: false }
    }
}

pub async fn execute(app: &mut MintApp, command: Command) -> Outcome {
    match command {
        Command::Help => Outcome::show(HELP.to_owned()),
        Command::Status => Outcome::show(render_status(app)),
        Command::Wallets => {
            if app.registry().is_empty() {
                app.discover().await;
            }
            Outcome::show(render_wallets(app))
        }
        Command::Connect(target) => {
            // outcome lands in the activity log
            let _ = app.connect(target).await;
            Outcome::show(String::new())
        }
        Command::Disconnect => {
            app.disconnect().await;
            Outcome::show(String::new())
        }
        Command::Mint(raw) => {
            let _ = app.mint(&raw).await;
            Outcome::show(String::new())
        }
        Command::Recent => Outcome::show(render_recent(app)),
        Command::Gallery => {
            app.load_more_gallery();
            Outcome::show(render_gallery(app))
        }
        Command::Log => Outcome::show(app.state.log.render()),
        Command::Quit => Outcome {
            output: String::new(),
            quit: true,
        },
        Command::Empty => Outcome::show(String::new()),
        Command::Unknown(raw) => Outcome::show(format!("unknown command '{raw}', try 'help'")),
    }
}

pub fn render_status(app: &MintApp) -> String {
    let chain = app.chain();
    let mut out = String::new();

    let _ = writeln!(out, "Network:   {}", chain.name);
    match &app.state.snapshot {
        Some(snapshot) => {
            let _ = writeln!(out, "Sale:      {}", snapshot.sale_label());
            let _ = writeln!(out, "Price:     {} ETH", format_ether(snapshot.price_wei));
            let _ = writeln!(out, "Minted:    {}", snapshot.total_minted);
            let _ = writeln!(out, "Remaining: {}", snapshot.remaining);
        }
        None => {
            for label in ["Sale:     ", "Price:    ", "Minted:   ", "Remaining:"] {
                let _ = writeln!(out, "{label} -");
            }
        }
    }

    match app.session() {
        Some(session) => {
            let _ = writeln!(out, "Wallet:    {} ({})", session.address.short(), session.provider_name);
        }
        None => {
            let _ = writeln!(out, "Wallet:    not connected");
        }
    }
    if let Some(attempt) = &app.state.last_attempt {
        let status = match attempt.status {
            MintStatus::Pending => "pending",
            MintStatus::Confirmed => "confirmed",
            MintStatus::Failed => "failed",
        };
        let _ = writeln!(out, "Last mint: {} x{} ({status})", attempt.entry_point.as_deref().unwrap_or("-"), attempt.quantity);
    }
    let contract = app.contract_address();
    let _ = write!(out, "Contract:  {} {}", contract.short(), chain.address_url(&contract.0));
    out
}

pub fn render_wallets(app: &MintApp) -> String {
    let mut out = String::new();
    for (index, detail) in app.registry().providers().iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({})", index + 1, detail.info.name, detail.info.rdns);
    }
    if app.pairing_enabled() {
        let _ = writeln!(out, "qr. WalletConnect");
    }
    if out.is_empty() {
        out.push_str("No wallets discovered.");
    }
    out.trim_end().to_owned()
}

pub fn render_recent(app: &MintApp) -> String {
    if app.state.recent.is_empty() {
        return "No recent mints.".to_owned();
    }
    let chain = app.chain();
    app.state
        .recent
        .iter()
        .map(|record| {
            format!(
                "#{}  {}  {}",
                record.token_id,
                record.recipient.short(),
                chain.tx_url(&record.tx_hash)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_gallery(app: &MintApp) -> String {
    let gallery = &app.state.gallery;
    let mut out = format!("{} images loaded", gallery.loaded());
    if gallery.is_exhausted() {
        out.push_str(" (end of collection)");
    }
    if let Some(last) = gallery.visible().last() {
        let _ = write!(out, ", latest {}", last.url);
    }
    out
}
