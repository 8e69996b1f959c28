pub mod deploy;
pub mod revert;

pub type CmdResult<T> = pagegate::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}
