pub mod list;

pub use list::ListMembersQuery;
