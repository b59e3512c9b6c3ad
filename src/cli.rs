use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meemee")]
#[command(author, version, about = "Telegram bots for personalized meme videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the commerce bot (catalog, generations, payments)
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Run the lead-capture bot, plus the admin bot when ADMIN_BOT_TOKEN is set
    Leads,

    /// Export stored leads as CSV (or JSON)
    ExportLeads {
        /// Only leads of this day (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Write JSON instead of CSV
        #[arg(long)]
        json: bool,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_webhook() {
        let cli = Cli::parse_from(["meemee", "run", "--webhook"]);
        assert_eq!(cli.command, Some(Commands::Run { webhook: true }));
    }

    #[test]
    fn test_parse_export_leads() {
        let cli = Cli::parse_from(["meemee", "export-leads", "--date", "2024-05-01", "-o", "leads.csv"]);
        assert_eq!(
            cli.command,
            Some(Commands::ExportLeads {
                date: Some("2024-05-01".to_string()),
                json: false,
                output: Some("leads.csv".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_export_leads_json() {
        let cli = Cli::parse_from(["meemee", "export-leads", "--json"]);
        assert_eq!(
            cli.command,
            Some(Commands::ExportLeads {
                date: None,
                json: true,
                output: None,
            })
        );
    }

    #[test]
    fn test_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["meemee"]);
        assert!(cli.command.is_none());
    }
}
