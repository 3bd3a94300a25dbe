/// Forward-slash path arithmetic (`join`, `resolve`, `relative`, ...) and the `mk_path!` macro
pub mod path;
/// `Result::filter_err`
mod result_filter_err;

//noinspection RsUnusedImport (IntelliJ bug)
pub(crate) use path::mk_path;
pub(crate) use result_filter_err::ResultFilterErr;
