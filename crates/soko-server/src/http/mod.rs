pub(crate) mod handlers;
pub(crate) mod projects;
pub(crate) mod writes;
