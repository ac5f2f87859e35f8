use tracing::debug;

use crate::error::SelectionError;
use crate::protocol::Protocol;
use crate::suggestions::COMPARE_KEY;

/// Which protocol(s) the next question is asked about.
///
/// The comparison partner always differs from the selected protocol, in and
/// out of comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolSelection {
    selected: Protocol,
    compare_mode: bool,
    compare_with: Protocol,
}

impl Default for ProtocolSelection {
    fn default() -> Self {
        Self::new(Protocol::Aave)
    }
}

impl ProtocolSelection {
    pub fn new(selected: Protocol) -> Self {
        Self {
            selected,
            compare_mode: false,
            compare_with: first_other(selected),
        }
    }

    pub fn selected(&self) -> Protocol {
        self.selected
    }

    pub fn compare_mode(&self) -> bool {
        self.compare_mode
    }

    pub fn compare_protocol(&self) -> Protocol {
        self.compare_with
    }

    /// Makes `protocol` the active one. If it was the comparison partner,
    /// the partner moves to the first remaining protocol.
    pub fn select(&mut self, protocol: Protocol) {
        self.selected = protocol;
        if self.compare_with == protocol {
            self.compare_with = first_other(protocol);
            debug!(
                selected = %protocol,
                compare_with = %self.compare_with,
                "comparison partner reassigned"
            );
        }
    }

    pub fn set_compare_protocol(&mut self, protocol: Protocol) -> Result<(), SelectionError> {
        if protocol == self.selected {
            return Err(SelectionError::SameProtocol(protocol));
        }
        self.compare_with = protocol;
        Ok(())
    }

    pub fn toggle_compare(&mut self) {
        self.compare_mode = !self.compare_mode;
    }

    /// Every protocol except the selected one, in catalog order.
    pub fn eligible_compare_protocols(&self) -> Vec<Protocol> {
        Protocol::all()
            .into_iter()
            .filter(|p| *p != self.selected)
            .collect()
    }

    /// `[selected, partner]` in comparison mode, `None` otherwise.
    pub fn comparison_pair(&self) -> Option<[Protocol; 2]> {
        self.compare_mode.then_some([self.selected, self.compare_with])
    }

    /// Key into the suggestion catalog for the current mode.
    pub fn mode_key(&self) -> &'static str {
        if self.compare_mode {
            COMPARE_KEY
        } else {
            self.selected.as_str()
        }
    }

    pub fn cycle_selected(&mut self) {
        let all = Protocol::all();
        let i = all.iter().position(|p| *p == self.selected).unwrap_or(0);
        self.select(all[(i + 1) % all.len()]);
    }

    pub fn cycle_compare_protocol(&mut self) {
        let eligible = self.eligible_compare_protocols();
        let next = match eligible.iter().position(|p| *p == self.compare_with) {
            Some(i) => eligible[(i + 1) % eligible.len()],
            None => eligible[0],
        };
        self.compare_with = next;
    }

    pub fn title(&self) -> String {
        if self.compare_mode {
            format!(
                "{} vs {}",
                self.selected.display_name(),
                self.compare_with.display_name()
            )
        } else {
            self.selected.display_name().to_string()
        }
    }
}

fn first_other(protocol: Protocol) -> Protocol {
    Protocol::all()
        .into_iter()
        .find(|p| *p != protocol)
        .unwrap_or(protocol)
}
