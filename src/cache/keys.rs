//! Memoization key definitions.

use std::fmt;

/// Identifies one memoized call: the namespace names the memoized function,
/// the arguments are kept in call order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    namespace: String,
    args: Vec<String>,
}

impl MemoKey {
    pub fn new<I, S>(namespace: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace)?;
        for arg in &self.args {
            write!(f, "-{arg}")?;
        }
        Ok(())
    }
}
