//! Data models for the campus library

pub mod book;
pub mod loan;
pub mod student;

// Re-export commonly used types
pub use book::{BookCopy, BookCopyShort, CopyId};
pub use loan::{CopyTarget, Loan, LoanDetails, LOAN_PERIOD_DAYS};
pub use student::{Student, StudentDocument, StudentId, StudentShort};
