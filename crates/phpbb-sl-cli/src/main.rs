//! `phpbb`: command-line access to a phpBB forum.

use anyhow::bail;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use phpbb_sl::{ClientConfig, Folder};
use phpbb_sl_cli::config::{cleaning_folders, FolderArg, Settings};
use phpbb_sl_cli::output::{self, Exploration};
use phpbb_sl_cli::session::{self, logged_in};

#[derive(Parser)]
#[command(
    name = "phpbb",
    about = "Private messages, birthdays, members and forum listings of a phpBB board",
    version
)]
struct Cli {
    /// Forum root URL. Falls back to PHPBB_HOST.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Account name. Falls back to PHPBB_USERNAME.
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Account password. Falls back to PHPBB_PASSWORD, then a prompt.
    #[arg(long, global = true)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a private message.
    Send {
        /// Recipient's username.
        to: String,
        subject: String,
        /// Message body (BBCode allowed).
        #[arg(short, long)]
        message: String,
    },

    /// List a private message folder.
    Messages {
        #[arg(long, value_enum, default_value_t = FolderArg::Unread)]
        folder: FolderArg,
    },

    /// Read unread messages.
    Read {
        /// Only messages from this sender.
        #[arg(long)]
        from: Option<String>,

        /// Delete each message once read.
        #[arg(long)]
        delete: bool,
    },

    /// Delete messages, by default every read message in the inbox.
    Clean {
        /// Folder to clean. Repeat to clean several.
        #[arg(long = "folder", value_enum)]
        folders: Vec<FolderArg>,

        /// Clean the unread, read and sent folders.
        #[arg(long, conflicts_with = "folders")]
        all: bool,

        /// Only messages exchanged with this member (sender in the inbox,
        /// receiver in the sentbox).
        #[arg(long)]
        with: Option<String>,
    },

    /// Members whose birthday is today.
    Birthdays,

    /// Id and rank of a member.
    Member { name: String },

    /// Sub-forums of a forum, e.g. `viewforum.php?f=11`.
    Explore {
        forum: String,

        /// Also list every topic, across all pages.
        #[arg(long)]
        topics: bool,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   phpbb completions bash > ~/.local/share/bash-completion/completions/phpbb
    ///   phpbb completions zsh > ~/.zfunc/_phpbb
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "phpbb", &mut std::io::stdout());
        return Ok(());
    }

    let settings = Settings::resolve(cli.host, cli.username, cli.password)?;
    let config = ClientConfig::default();
    let json = cli.json;

    match cli.command {
        Commands::Send {
            to,
            subject,
            message,
        } => {
            let recipient = to.clone();
            let sent = logged_in(&settings, config, move |forum| {
                Box::pin(async move { forum.send_private_message(&to, &subject, &message).await })
            })
            .await?;
            if !sent {
                bail!("{recipient} is not a member of this forum");
            }
            output::emit(&serde_json::json!({ "sent_to": recipient }), json, |_| {
                format!("message sent to {recipient}\n")
            })?;
        }

        Commands::Messages { folder } => {
            let folder = Folder::from(folder);
            let messages = logged_in(&settings, config, move |forum| {
                Box::pin(async move { forum.fetch_messages(folder).await })
            })
            .await?;
            output::emit(messages.as_slice(), json, output::message_list)?;
        }

        Commands::Read { from, delete } => {
            let read = logged_in(&settings, config, move |forum| {
                Box::pin(async move {
                    let mut unread = forum.fetch_unread_messages().await?;
                    if let Some(sender) = from {
                        unread.retain(|m| m.sender == sender);
                    }
                    let mut read = Vec::with_capacity(unread.len());
                    for message in &unread {
                        let opened = forum.read_message(message).await?;
                        if delete {
                            forum.delete_message(&opened).await?;
                        }
                        read.push(opened);
                    }
                    Ok(read)
                })
            })
            .await?;
            output::emit(read.as_slice(), json, output::message_bodies)?;
        }

        Commands::Clean { folders, all, with } => {
            let folders = cleaning_folders(&folders, all);
            let deleted = logged_in(&settings, config, move |forum| {
                Box::pin(async move { session::clean(forum, &folders, with.as_deref()).await })
            })
            .await?;
            output::emit(&serde_json::json!({ "deleted": deleted }), json, |_| {
                format!("{deleted} message(s) deleted\n")
            })?;
        }

        Commands::Birthdays => {
            let list = logged_in(&settings, config, move |forum| {
                Box::pin(async move { forum.fetch_birthdays().await })
            })
            .await?;
            output::emit(list.as_slice(), json, output::birthdays)?;
        }

        Commands::Member { name } => {
            let lookup = name.clone();
            let info = logged_in(&settings, config, move |forum| {
                Box::pin(async move { forum.member_info(&lookup).await })
            })
            .await?;
            output::emit(&info, json, |info| output::member(&name, info))?;
        }

        Commands::Explore { forum, topics } => {
            let found = logged_in(&settings, config, move |client| {
                Box::pin(async move {
                    let sub_forums = client.fetch_sub_forums(&forum).await?;
                    let topics = if topics {
                        Some(client.fetch_all_topics(&forum).await?)
                    } else {
                        None
                    };
                    Ok(Exploration { sub_forums, topics })
                })
            })
            .await?;
            output::emit(&found, json, output::exploration)?;
        }

        // Handled before credentials are resolved.
        Commands::Completions { .. } => {}
    }

    Ok(())
}
