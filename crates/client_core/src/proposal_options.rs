use shared::protocol::{ProposalOptions, FOUR_HOUR_SEC};

/// Declared lower bound of the duration input.
pub const DURATION_MIN: u64 = FOUR_HOUR_SEC;

/// Collapsible "Proposal Settings" panel.
///
/// Every edit that changes a field re-emits the whole [`ProposalOptions`]
/// through `on_change`, as does construction. Expanding or collapsing the
/// panel never emits.
pub struct ProposalOptionsPanel<F>
where
    F: FnMut(&ProposalOptions),
{
    options: ProposalOptions,
    expanded: bool,
    on_change: F,
}

impl<F> ProposalOptionsPanel<F>
where
    F: FnMut(&ProposalOptions),
{
    pub fn new(on_change: F) -> Self {
        let mut panel = Self {
            options: ProposalOptions::default(),
            expanded: false,
            on_change,
        };
        panel.emit();
        panel
    }

    pub fn options(&self) -> &ProposalOptions {
        &self.options
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn set_time_start(&mut self, raw: impl Into<String>) {
        let raw = raw.into();
        if self.options.time_start != raw {
            self.options.time_start = raw;
            self.emit();
        }
    }

    pub fn set_duration_seconds(&mut self, raw: impl Into<String>) {
        let raw = raw.into();
        if self.options.duration_seconds != raw {
            self.options.duration_seconds = raw;
            self.emit();
        }
    }

    pub fn set_execute(&mut self, execute: bool) {
        if self.options.execute != execute {
            self.options.execute = execute;
            self.emit();
        }
    }

    fn emit(&mut self) {
        (self.on_change)(&self.options);
    }
}

#[cfg(test)]
#[path = "tests/proposal_options_tests.rs"]
mod tests;
