use clap::{Parser, Subcommand};
use std::path::PathBuf;

const BANNER: &str = r"
  ____ ___ ________
 / ___/ _ \__  /_ _|
| |  | | | |/ / | |
| |__| |_| / /_ | |
 \____\___/____|___|
";

/// Cozi - Vencord plugin manager.
#[derive(Parser, Debug)]
#[command(
    name = "cozi",
    version,
    about,
    before_help = BANNER,
    after_help = "Example:\n  cozi add https://git.nin0.dev/userplugins/venfetch\n  cozi patch\n\nMake sure you enable the plugins in settings!",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Show collaborator output and debug logs on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// State directory (defaults to `[paths] root_dir` from the config).
    #[arg(long, env = "COZI_HOME", global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a plugin repository (single git link or a file of git links).
    Add {
        #[arg(value_name = "GIT_LINK|FILE")]
        source: String,
    },
    /// Build and inject Vencord.
    Patch,
    /// Remove a plugin repository by name.
    Delete {
        #[arg(value_name = "REPO_NAME")]
        name: String,
    },
    /// Export the plugin list to a file.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Add every plugin listed in a file.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List tracked plugins.
    List,
    /// Show a status report of the repository, plugins and toolchain.
    Status,
    /// Pull and reinstall every tracked plugin.
    Update,
    /// Remove all cozi state and caches.
    Uninstall,
}

impl Command {
    /// Whether the command needs the state directory and main repository set up first.
    pub fn needs_setup(&self) -> bool {
        !matches!(self, Command::Uninstall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["cozi", "add", "https://example.com/foo.git", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Add {
                source: "https://example.com/foo.git".into()
            }
        );

        let cli = Cli::try_parse_from(["cozi", "--verbose", "update"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command, Command::Update);
    }

    #[test]
    fn delete_requires_a_name() {
        assert!(Cli::try_parse_from(["cozi", "delete"]).is_err());
    }

    #[test]
    fn uninstall_skips_setup() {
        assert!(!Command::Uninstall.needs_setup());
        assert!(Command::List.needs_setup());
    }
}
