use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures that can only be detected at run time.
///
/// Everything else (a type outside the catalogue, a missing overload) is
/// rejected by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("value is none of the types in {catalogue}'s catalogue ({})", .members.join(", "))]
    CatalogueMismatch {
        catalogue: &'static str,
        members: &'static [&'static str],
    },
    #[error("ordinal {ordinal} is out of range for {catalogue} ({len} members)")]
    OrdinalOutOfRange {
        catalogue: &'static str,
        ordinal: usize,
        len: usize,
    },
}

impl Error {
    pub fn catalogue_mismatch(catalogue: &'static str, members: &'static [&'static str]) -> Self {
        tracing::trace!(catalogue, "catalogue mismatch");
        Error::CatalogueMismatch { catalogue, members }
    }

    /// Failure of a generated `TryFrom<&dyn Any>`: the value is none of the
    /// catalogue's types.
    pub fn unknown_referent(catalogue: &'static str, members: &'static [&'static str]) -> Self {
        tracing::debug!(catalogue, "no catalogue member matches the value");
        Self::catalogue_mismatch(catalogue, members)
    }

    pub fn ordinal_out_of_range(catalogue: &'static str, ordinal: usize, len: usize) -> Self {
        tracing::trace!(catalogue, ordinal, len, "ordinal out of range");
        Error::OrdinalOutOfRange {
            catalogue,
            ordinal,
            len,
        }
    }
}
