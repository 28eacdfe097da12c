mod session;

pub use session::DbSession;
