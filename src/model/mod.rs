pub mod employee;
pub mod leave_application;
pub mod leave_balance;
pub mod leave_type;
pub mod notification;
pub mod role;
