//! Command dispatch and handler modules.

mod check;
mod fmt;
mod march;
mod run;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to its handler and return the exit status.
pub async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run {
            file,
            march,
            include,
            batch,
            open_loop_target,
            profile_interval,
            disable_warnings,
        } => {
            run::exec(run::RunArgs {
                file,
                march,
                include,
                batch,
                open_loop_target,
                profile_interval,
                disable_warnings,
            })
            .await
        }
        Command::Check {
            files,
            march,
            include,
        } => check::exec(&files, march.as_deref(), include.as_deref(), cli.verbose),
        Command::Fmt { file, check } => fmt::exec(&file, check),
        Command::March => march::exec(),
    }
}
