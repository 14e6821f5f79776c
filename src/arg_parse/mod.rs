use crate::error::ArgsError;

/// Whether a run talks to Telegram and persists the sent links, or only logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Deliver,
    DryRun,
}

#[derive(Clone, Debug)]
pub struct CmdArgs {
    pub env_file: String,
    pub dry_run: bool,
}

impl CmdArgs {
    pub fn parse(args: Vec<String>) -> Result<Self, ArgsError> {
        let mut env_file = String::from(".env");
        let mut dry_run = false;
        {
            let mut ap = argparse::ArgumentParser::new();
            ap.set_description("Forward new feed items to a Telegram chat");
            ap.refer(&mut env_file).add_option(
                &["-e", "--env-file"],
                argparse::Store,
                "Env file to load before reading the environment; default is .env",
            );
            ap.refer(&mut dry_run).add_option(
                &["-n", "--dry-run"],
                argparse::StoreTrue,
                "Log the messages instead of sending them; nothing is persisted",
            );

            match ap.parse(args, &mut std::io::stdout(), &mut std::io::stderr()) {
                Ok(()) => {}
                Err(0) => return Err(ArgsError::Help),
                Err(_) => return Err(ArgsError::Invalid),
            }
        }

        Ok(CmdArgs { env_file, dry_run })
    }

    pub fn get_mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Deliver
        }
    }
}
