use std::time::Duration;

use shared::{
    domain::{AccountId, AmountParseError, TokenAmount, E8S_PER_TOKEN},
    protocol::{Command, Disburse},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::debug;

use crate::debounce::{spawn_debouncer, DebounceInput};

/// Longest account text the input accepts.
pub const ACCOUNT_MAX_CHARS: usize = 64;

pub const INVALID_ACCOUNT: &str = "Invalid account";
pub const INVALID_AMOUNT: &str = "Invalid amount";
pub const AMOUNT_EXCEEDS_STAKE: &str = "Amount exceeds stake";

/// What the form hands to its owner after each debounced edit: either a
/// command to submit, or no command and the error to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisburseOutcome {
    pub command: Option<Command>,
    pub error: Option<String>,
}

impl DisburseOutcome {
    fn ok(command: Command) -> Self {
        Self {
            command: Some(command),
            error: None,
        }
    }

    fn rejected(error: &str) -> Self {
        Self {
            command: None,
            error: Some(error.to_string()),
        }
    }
}

/// Upper bound of the amount input in whole tokens.
pub fn amount_ceiling(stake: Option<TokenAmount>) -> Option<u64> {
    stake.map(|stake| stake.e8s / E8S_PER_TOKEN)
}

/// Builds a `Disburse` command from the raw inputs.
///
/// Empty inputs are valid and leave the matching field unset.
pub fn derive_disburse(
    account: &str,
    amount: &str,
    stake: Option<TokenAmount>,
) -> DisburseOutcome {
    let to_account = if account.is_empty() {
        None
    } else {
        match account.parse::<AccountId>() {
            Ok(account) => Some(account),
            Err(err) => {
                debug!(%err, "rejecting disburse account");
                return DisburseOutcome::rejected(INVALID_ACCOUNT);
            }
        }
    };

    let amount = match TokenAmount::parse_tokens(amount) {
        Ok(amount) => Some(amount),
        Err(AmountParseError::Empty) => None,
        Err(err) => {
            debug!(%err, "rejecting disburse amount");
            return DisburseOutcome::rejected(INVALID_AMOUNT);
        }
    };

    if let (Some(amount), Some(ceiling)) = (amount, amount_ceiling(stake)) {
        if amount.e8s > ceiling.saturating_mul(E8S_PER_TOKEN) {
            return DisburseOutcome::rejected(AMOUNT_EXCEEDS_STAKE);
        }
    }

    DisburseOutcome::ok(Command::Disburse(Disburse { to_account, amount }))
}

fn truncate_chars(raw: &str, max: usize) -> String {
    raw.chars().take(max).collect()
}

/// Live disburse form: raw edits go through per-field debouncers and every
/// settled change produces one [`DisburseOutcome`].
pub struct DisburseForm {
    account: DebounceInput<String>,
    amount: DebounceInput<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DisburseForm {
    pub fn spawn(
        stake: Option<TokenAmount>,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<DisburseOutcome>) {
        let (account, mut account_rx) = spawn_debouncer(String::new(), delay);
        let (amount, mut amount_rx) = spawn_debouncer(String::new(), delay);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            if outcome_tx.send(derive_disburse("", "", stake)).is_err() {
                return;
            }
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = account_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = amount_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                let account = account_rx.borrow_and_update().clone();
                let amount = amount_rx.borrow_and_update().clone();
                let outcome = derive_disburse(&account, &amount, stake);
                if let Some(error) = &outcome.error {
                    debug!(%error, "disburse form invalid");
                }
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        (
            Self {
                account,
                amount,
                shutdown: Some(shutdown_tx),
                task,
            },
            outcome_rx,
        )
    }

    /// Account input; text past [`ACCOUNT_MAX_CHARS`] is cut off.
    pub fn set_account(&self, raw: &str) {
        self.account.set(truncate_chars(raw, ACCOUNT_MAX_CHARS));
    }

    pub fn set_amount(&self, raw: &str) {
        self.amount.set(raw.to_string());
    }

    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

#[cfg(test)]
#[path = "tests/disburse_form_tests.rs"]
mod tests;
