//! In-memory student registry

use indexmap::IndexMap;

use crate::models::student::normalize_email;
use crate::models::{Student, StudentDocument, StudentId};

/// Students keyed by lower-cased email, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct StudentRegistry {
    students: IndexMap<String, Student>,
}

impl StudentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the student stored under the same email
    pub fn add(&mut self, student: Student) {
        self.students.insert(student.key(), student);
    }

    pub fn by_email(&self, email: &str) -> Option<&Student> {
        self.students.get(&normalize_email(email))
    }

    pub(crate) fn by_email_mut(&mut self, email: &str) -> Option<&mut Student> {
        self.students.get_mut(&normalize_email(email))
    }

    pub(crate) fn by_id_mut(&mut self, id: StudentId) -> Option<&mut Student> {
        self.students.values_mut().find(|student| student.id == id)
    }

    pub fn email_exists(&self, email: &str) -> bool {
        self.students.contains_key(&normalize_email(email))
    }

    pub fn id_exists(&self, id: StudentId) -> bool {
        self.students.values().any(|student| student.id == id)
    }

    /// The student registered under `email`, if `password` matches
    pub fn authenticate(&self, email: &str, password: &str) -> Option<&Student> {
        self.by_email(email)
            .filter(|student| student.is_password(password))
    }

    /// Snapshot of the persisted form of a student
    pub fn document(&self, email: &str) -> Option<StudentDocument> {
        self.by_email(email).map(Student::to_document)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// By last name, then first name
    pub fn sorted_by_name(&self) -> Vec<&Student> {
        let mut students: Vec<_> = self.iter().collect();
        students.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        students
    }

    pub fn sorted_by_email(&self) -> Vec<&Student> {
        let mut students: Vec<_> = self.iter().collect();
        students.sort_by_key(|student| student.key());
        students
    }

    pub fn sorted_by_id(&self) -> Vec<&Student> {
        let mut students: Vec<_> = self.iter().collect();
        students.sort_by_key(|student| student.id);
        students
    }

    /// Fewest loans first
    pub fn sorted_by_books_borrowed(&self) -> Vec<&Student> {
        let mut students: Vec<_> = self.iter().collect();
        students.sort_by_key(|student| student.loans().len());
        students
    }
}
