//! In-memory library state and the lending rules that keep it consistent
//!
//! `Library` owns both registries. Borrow and return are the only operations
//! that touch loans, and they always update the copy and the student together:
//! a copy carries a loan exactly when that loan is listed on its holder.

pub mod books;
pub mod students;

use chrono::{Days, NaiveDate};
use snowflaked::Generator;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::LOAN_PERIOD_DAYS,
        student::{normalize_email, CreateStudent},
        CopyId, CopyTarget, Loan, LoanDetails, Student, StudentDocument, StudentId,
    },
};

pub use books::BookRegistry;
pub use students::StudentRegistry;

/// Result of a return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub copy_id: CopyId,
    /// Loan the copy carried before the return, if it was held
    pub previous: Option<Loan>,
    /// Emails of the students whose loans changed
    pub affected: Vec<String>,
}

pub struct Library {
    books: BookRegistry,
    students: StudentRegistry,
    ids: Generator,
}

impl Library {
    pub fn new(books: BookRegistry) -> Self {
        Self {
            books,
            students: StudentRegistry::new(),
            ids: Generator::new(0),
        }
    }

    /// Build the library from a freshly loaded catalog and the persisted
    /// students, re-deriving which copies are on loan from the students' loans.
    ///
    /// Returns the library and the emails of students whose loans had to be
    /// adjusted to fit the catalog, or whose id was already taken; their
    /// documents should be persisted again.
    pub fn restore(
        books: BookRegistry,
        documents: Vec<StudentDocument>,
        today: NaiveDate,
    ) -> (Self, Vec<String>) {
        let mut library = Self::new(books);
        let mut changed = Vec::new();

        for mut document in documents {
            let key = document.key();
            if library.students.email_exists(&key) {
                tracing::warn!("Duplicate student document for {}, keeping the first", key);
                continue;
            }

            // older records may reuse an id; loans are matched to holders by id
            let renumbered = library.students.id_exists(document.id);
            if renumbered {
                let id = library.next_student_id();
                tracing::warn!(
                    "Student {} shares id {} with another student, reassigned {}",
                    key,
                    document.id,
                    id
                );
                document.id = id;
            }

            library.students.add(Student {
                id: document.id,
                first_name: document.first_name.clone(),
                last_name: document.last_name.clone(),
                email: document.email.clone(),
                password: document.password.clone(),
                loans: Vec::new(),
            });

            let adjusted = library.reconcile(&document, today);
            if adjusted || renumbered {
                changed.push(key);
            }
        }

        (library, changed)
    }

    pub fn books(&self) -> &BookRegistry {
        &self.books
    }

    pub fn students(&self) -> &StudentRegistry {
        &self.students
    }

    /// Add a new student under a fresh identifier
    pub fn register(&mut self, request: &CreateStudent) -> AppResult<StudentDocument> {
        if self.students.email_exists(&request.email) {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                request.email.trim()
            )));
        }

        let id = self.next_student_id();
        let student = Student::new(id, request);
        let document = student.to_document();
        self.students.add(student);
        Ok(document)
    }

    /// Lend an available copy to a student, due `LOAN_PERIOD_DAYS` after `today`
    pub fn borrow(&mut self, copy_id: CopyId, email: &str, today: NaiveDate) -> AppResult<Loan> {
        let copy = self
            .books
            .by_id(copy_id)
            .ok_or_else(|| AppError::NotFound(format!("Copy {} not found", copy_id)))?;
        let student = self
            .students
            .by_email(email)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))?;

        if !copy.is_available() {
            tracing::debug!("Borrow rejected: copy {} is already on loan", copy_id);
            return Err(AppError::BusinessRule(format!(
                "Copy {} is already on loan",
                copy_id
            )));
        }

        let loan = Loan::starting(copy, student.id, today)?;
        self.books.lend(loan.clone());
        if let Some(student) = self.students.by_email_mut(email) {
            student.loans.push(loan.clone());
        }

        Ok(loan)
    }

    /// Put a copy back on the shelf.
    ///
    /// The copy always ends up available, whoever held it. The loan is removed
    /// from the returning student and, if someone else held the copy, from that
    /// student as well.
    pub fn give_back(&mut self, copy_id: CopyId, email: &str) -> AppResult<ReturnOutcome> {
        if self.books.by_id(copy_id).is_none() {
            return Err(AppError::NotFound(format!("Copy {} not found", copy_id)));
        }
        let student = self
            .students
            .by_email_mut(email)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))?;

        student.loans.retain(|loan| loan.copy_id != copy_id);
        let returner_id = student.id;
        let mut affected = vec![student.key()];

        let previous = self.books.release(copy_id);

        if let Some(loan) = previous.as_ref().filter(|loan| loan.student_id != returner_id) {
            tracing::warn!(
                "Copy {} returned by {} but held by student {}",
                copy_id,
                normalize_email(email),
                loan.student_id
            );
            if let Some(holder) = self.students.by_id_mut(loan.student_id) {
                holder.loans.retain(|held| held.copy_id != copy_id);
                affected.push(holder.key());
            }
        }

        Ok(ReturnOutcome {
            copy_id,
            previous,
            affected,
        })
    }

    /// Copy a borrow request designates: by id, or the first available copy of an ISBN
    pub fn resolve_borrow(&self, target: &CopyTarget) -> AppResult<CopyId> {
        match target {
            CopyTarget::Id(id) => Ok(*id),
            CopyTarget::Isbn(isbn) => match self.books.first_available_by_isbn(isbn) {
                Some(copy) => Ok(copy.id),
                None if self.books.by_isbn(isbn).is_some() => Err(AppError::BusinessRule(
                    format!("No copy of {} is available", isbn),
                )),
                None => Err(AppError::NotFound(format!("No copy with ISBN {}", isbn))),
            },
        }
    }

    /// Copy a return request designates. An ISBN is resolved against the
    /// student's own loans only, and must match exactly one of them.
    pub fn resolve_return(&self, email: &str, target: &CopyTarget) -> AppResult<CopyId> {
        let isbn = match target {
            CopyTarget::Id(id) => return Ok(*id),
            CopyTarget::Isbn(isbn) => isbn,
        };

        let student = self
            .students
            .by_email(email)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))?;

        let held: Vec<CopyId> = student
            .loans()
            .iter()
            .filter(|loan| loan.isbn.to_lowercase() == isbn.to_lowercase())
            .map(|loan| loan.copy_id)
            .collect();

        match held.as_slice() {
            [copy_id] => Ok(*copy_id),
            [] => Err(AppError::NotFound(format!(
                "{} holds no copy with ISBN {}",
                student.email, isbn
            ))),
            _ => Err(AppError::BadRequest(format!(
                "{} holds several copies with ISBN {}; return by copy id",
                student.email, isbn
            ))),
        }
    }

    /// Copies a student holds, with due dates
    pub fn student_loans(&self, email: &str, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let student = self
            .students
            .by_email(email)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))?;

        Ok(student
            .loans()
            .iter()
            .filter_map(|loan| {
                self.books
                    .by_id(loan.copy_id)
                    .map(|copy| LoanDetails::new(loan, copy, today))
            })
            .collect())
    }

    /// Attach a student's persisted loans to the catalog. Returns true when
    /// the loans had to change to fit the catalog.
    fn reconcile(&mut self, document: &StudentDocument, today: NaiveDate) -> bool {
        let key = document.key();
        let mut changed = false;

        for record in &document.loans {
            let exact = self.books.by_id(record.copy_id).filter(|copy| {
                copy.is_available() && copy.isbn.to_lowercase() == record.isbn.to_lowercase()
            });

            let copy_id = match exact {
                Some(copy) => copy.id,
                None => match self.books.first_available_by_isbn(&record.isbn) {
                    Some(copy) => {
                        tracing::warn!(
                            "Loan of copy {} for {} relinked to copy {}",
                            record.copy_id,
                            key,
                            copy.id
                        );
                        changed = true;
                        copy.id
                    }
                    None => {
                        tracing::warn!(
                            "Dropping loan of {} for {}: no matching copy in catalog",
                            record.isbn,
                            key
                        );
                        changed = true;
                        continue;
                    }
                },
            };

            self.attach(
                &key,
                Loan {
                    copy_id,
                    isbn: record.isbn.clone(),
                    student_id: document.id,
                    borrowed_on: record.borrowed_on,
                    due_date: record.due_date,
                },
            );
        }

        if document.loans.is_empty() && !document.current_books.is_empty() {
            changed |= self.reconcile_isbns(&key, document, today);
        }

        changed
    }

    /// Older documents only list ISBNs; link each to the first free copy,
    /// starting a fresh loan period today.
    fn reconcile_isbns(&mut self, key: &str, document: &StudentDocument, today: NaiveDate) -> bool {
        let Some(due_date) = today.checked_add_days(Days::new(LOAN_PERIOD_DAYS)) else {
            return false;
        };

        for isbn in &document.current_books {
            match self.books.first_available_by_isbn(isbn) {
                Some(copy) => {
                    let copy_id = copy.id;
                    self.attach(
                        key,
                        Loan {
                            copy_id,
                            isbn: isbn.clone(),
                            student_id: document.id,
                            borrowed_on: today,
                            due_date,
                        },
                    );
                }
                None => {
                    tracing::warn!("Dropping held ISBN {} for {}: no free copy", isbn, key);
                }
            }
        }

        true
    }

    fn attach(&mut self, key: &str, loan: Loan) {
        self.books.lend(loan.clone());
        if let Some(student) = self.students.by_email_mut(key) {
            student.loans.push(loan);
        }
    }

    fn next_student_id(&mut self) -> StudentId {
        loop {
            let id: StudentId = self.ids.generate();
            if !self.students.id_exists(id) {
                return id;
            }
        }
    }
}
