// Active-account synchronisation with the wallet provider.
//
// The coordinator polls `request_accounts` on a fixed interval. Polls may
// overlap; each is tagged with a sequence number and only a response newer
// than the last applied one is accepted.

use async_trait::async_trait;

use crate::chain::ChainError;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the wallet exposes; the first is the active one.
    async fn request_accounts(&self) -> Result<Vec<String>, ChainError>;

    /// Check that a compatible provider is reachable. Returns its version.
    async fn probe(&self) -> Result<String, ChainError>;
}

/// The active account from a provider's account list.
pub fn active_account(accounts: &[String]) -> Option<String> {
    accounts.first().filter(|a| !a.is_empty()).cloned()
}

/// Sequencing for overlapping account polls.
#[derive(Debug, Default)]
pub struct AccountPoll {
    next_seq: u64,
    applied_seq: u64,
}

impl AccountPoll {
    /// Tag a new poll.
    pub fn begin(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Record a completed poll. Returns `true` when its result should be
    /// applied, i.e. no later-issued poll has been applied already.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        true
    }
}

/// Whether `polled` differs from the current account.
pub fn account_changed(current: Option<&str>, polled: Option<&str>) -> bool {
    current != polled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_non_empty_account_is_active() {
        assert_eq!(
            active_account(&["0xa".to_string(), "0xb".to_string()]),
            Some("0xa".to_string())
        );
        assert_eq!(active_account(&[]), None);
        assert_eq!(active_account(&[String::new()]), None);
    }

    #[test]
    fn stale_poll_is_rejected() {
        let mut poll = AccountPoll::default();
        let first = poll.begin();
        let second = poll.begin();

        // The newer poll resolves first; the older one must not overwrite it.
        assert!(poll.accept(second));
        assert!(!poll.accept(first));
    }

    #[test]
    fn in_order_polls_are_all_accepted() {
        let mut poll = AccountPoll::default();
        let a = poll.begin();
        assert!(poll.accept(a));
        let b = poll.begin();
        assert!(poll.accept(b));
    }

    #[test]
    fn change_detection_compares_exactly() {
        assert!(account_changed(None, Some("0xa")));
        assert!(account_changed(Some("0xa"), None));
        assert!(account_changed(Some("0xa"), Some("0xb")));
        assert!(!account_changed(Some("0xa"), Some("0xa")));
    }
}
