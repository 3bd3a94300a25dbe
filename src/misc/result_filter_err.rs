/// Turn some errors of an empty result into success, e.g. to ignore "not found" when deleting
pub trait ResultFilterErr<E> {
    /// Keep the error only if `keep` returns `true`
    fn filter_err(self, keep: impl FnOnce(&E) -> bool) -> Self;
}

impl<E> ResultFilterErr<E> for Result<(), E> {
    #[inline]
    fn filter_err(self, keep: impl FnOnce(&E) -> bool) -> Self {
        match self {
            Err(e) if keep(&e) => Err(e),
            _ => Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::ResultFilterErr;

    #[test]
    fn filters_only_matching_errors() {
        let not_found: io::Result<()> = Err(io::Error::from(io::ErrorKind::NotFound));
        assert!(not_found.filter_err(|e| e.kind() != io::ErrorKind::NotFound).is_ok());

        let denied: io::Result<()> = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(denied.filter_err(|e| e.kind() != io::ErrorKind::NotFound).is_err());
    }
}
