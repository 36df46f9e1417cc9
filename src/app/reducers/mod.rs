mod connection;
mod content;
mod edits;
mod tables;
mod view;

pub use connection::reduce_connection;
pub use content::reduce_content;
pub use edits::reduce_edits;
pub use tables::reduce_tables;
pub use view::reduce_view;
