use std::process::ExitCode;

use anyhow::Result;
use clap::{Error as ClapError, Parser as _};
use log::error;

use crate::indexer_args::IndexerArgs;

mod indexer_args;
mod runner;

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        error.downcast_ref().map(ClapError::exit);
        error!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    let args = IndexerArgs::try_parse()?;

    runner::run(args.into_config())
}
