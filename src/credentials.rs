use crate::error::AppError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque provider API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let skip = self.0.chars().count().saturating_sub(4);
        let tail: String = self.0.chars().skip(skip).collect();
        write!(f, "Credential(…{})", tail)
    }
}

/// Round-robin key pool. Only the cursor is shared mutable state.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Result<Self, AppError> {
        if credentials.is_empty() {
            return Err(AppError::NoCredentials("at least one credential".into()));
        }
        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Builds a pool from a comma-separated list, ignoring blank entries.
    pub fn from_list(list: &str) -> Result<Self, AppError> {
        let credentials = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Credential::new)
            .collect();
        Self::new(credentials)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn next(&self) -> Credential {
        debug_assert!(!self.is_empty());
        let len = self.credentials.len();
        // Cursor stays within 0..len.
        let idx = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|current| current);
        self.credentials[idx].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn rotation_wraps_in_stable_order() {
        let pool = CredentialPool::from_list("k1,k2,k3").unwrap();
        let first_cycle: Vec<_> = (0..pool.len()).map(|_| pool.next()).collect();
        assert_eq!(
            first_cycle,
            vec![Credential::new("k1"), Credential::new("k2"), Credential::new("k3")]
        );
        assert_eq!(pool.next(), Credential::new("k1"));
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(CredentialPool::new(vec![]).is_err());
        assert!(matches!(
            CredentialPool::from_list(" , ,"),
            Err(AppError::NoCredentials(_))
        ));
    }

    #[test]
    fn list_entries_are_trimmed() {
        let pool = CredentialPool::from_list(" a , b,,").unwrap();
        assert_eq!(pool.len(), 2);
        assert!(!pool.is_empty());
        assert_eq!(pool.next().expose(), "a");
        assert_eq!(pool.next().expose(), "b");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let rendered = format!("{:?}", Credential::new("AIzaSySECRETabcd"));
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.ends_with("abcd)"));
    }

    #[test]
    fn concurrent_callers_share_one_cycle() {
        let pool = Arc::new(CredentialPool::from_list("a,b,c,d").unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.next())
            })
            .collect();
        let seen: HashSet<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().expose().to_string())
            .collect();
        assert_eq!(seen.len(), 4);
    }
}
