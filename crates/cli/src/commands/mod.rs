mod merge_deposit;
mod new_operators;
mod offboard;
mod onboard;
mod operators;
mod ping;

use std::fmt::Display;

use eyre::eyre;
pub use merge_deposit::MergeDepositCommand;
pub use new_operators::NewOperatorsCommand;
pub use offboard::OffboardCommand;
pub use onboard::OnboardCommand;
pub use operators::OperatorsCommand;
pub use ping::PingCommand;

use crate::problems::ProblemLog;

/// Log the problem summary and turn a non-empty log into a failing exit.
fn finish<K: PartialEq + Display>(problems: &ProblemLog<K>, label: &str) -> eyre::Result<()> {
    problems.report(label);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(eyre!("Encountered {} problem(s)", problems.len()))
    }
}
