use crate::validate::Check;
use crate::view::{Bucket, FacetDef, FacetRule, FieldValue, Record, SortKey, SortKind, ViewSchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Departments,
    Students,
    Circulars,
    Examinations,
    FeeStructures,
    Curricula,
    Graduation,
    ProgramSections,
    Subjects,
    Verifications,
}

/// Where a collection lives. `Memory` collections are seeded fixtures that are
/// mutated in process and never written to the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Backing {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusToggle {
    pub field: &'static str,
    pub on: &'static str,
    pub off: &'static str,
}

impl StatusToggle {
    pub fn next(&self, current: &str) -> &'static str {
        if current.eq_ignore_ascii_case(self.on) {
            self.off
        } else {
            self.on
        }
    }
}

pub const ALL_KINDS: [EntityKind; 10] = [
    EntityKind::Departments,
    EntityKind::Students,
    EntityKind::Circulars,
    EntityKind::Examinations,
    EntityKind::FeeStructures,
    EntityKind::Curricula,
    EntityKind::Graduation,
    EntityKind::ProgramSections,
    EntityKind::Subjects,
    EntityKind::Verifications,
];

const FACULTY_BUCKETS: &[Bucket] = &[
    Bucket::new("none", "No Faculty", Some(0.0), Some(0.0)),
    Bucket::new("1-5", "1-5 Faculty", Some(1.0), Some(5.0)),
    Bucket::new("6-10", "6-10 Faculty", Some(6.0), Some(10.0)),
    Bucket::new("10+", "10+ Faculty", Some(11.0), None),
];

const SEAT_BUCKETS: &[Bucket] = &[
    Bucket::new("empty", "No Students", Some(0.0), Some(0.0)),
    Bucket::new("1-30", "1-30 Students", Some(1.0), Some(30.0)),
    Bucket::new("31-60", "31-60 Students", Some(31.0), Some(60.0)),
    Bucket::new("60+", "60+ Students", Some(61.0), None),
];

const NOT_ASSIGNED: &[&str] = &["Not Assigned", "NA", "N/A"];

fn values(key: &'static str, label: &'static str, field: &'static str) -> FacetDef {
    FacetDef {
        key,
        label,
        rule: FacetRule::Values {
            field,
            fallback: None,
        },
    }
}

fn values_or(key: &'static str, label: &'static str, field: &'static str, fallback: &'static str) -> FacetDef {
    FacetDef {
        key,
        label,
        rule: FacetRule::Values {
            field,
            fallback: Some(fallback),
        },
    }
}

fn presence(
    key: &'static str,
    label: &'static str,
    field: &'static str,
    yes_label: &'static str,
    no_label: &'static str,
) -> FacetDef {
    FacetDef {
        key,
        label,
        rule: FacetRule::Presence {
            field,
            absent: NOT_ASSIGNED,
            yes_label,
            no_label,
        },
    }
}

fn range(key: &'static str, label: &'static str, field: &'static str) -> FacetDef {
    FacetDef {
        key,
        label,
        rule: FacetRule::Range { field },
    }
}

const fn key(key: &'static str, label: &'static str, field: &'static str, kind: SortKind) -> SortKey {
    SortKey {
        key,
        label,
        field,
        kind,
    }
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Departments => "departments",
            EntityKind::Students => "students",
            EntityKind::Circulars => "circulars",
            EntityKind::Examinations => "examinations",
            EntityKind::FeeStructures => "fee_structures",
            EntityKind::Curricula => "curricula",
            EntityKind::Graduation => "graduation",
            EntityKind::ProgramSections => "program_sections",
            EntityKind::Subjects => "subjects",
            EntityKind::Verifications => "verifications",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|k| k.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Departments => "Department",
            EntityKind::Students => "Student",
            EntityKind::Circulars => "Circular",
            EntityKind::Examinations => "Examination",
            EntityKind::FeeStructures => "Fee structure",
            EntityKind::Curricula => "Curriculum",
            EntityKind::Graduation => "Graduation record",
            EntityKind::ProgramSections => "Section",
            EntityKind::Subjects => "Subject",
            EntityKind::Verifications => "Verification",
        }
    }

    pub fn backing(self) -> Backing {
        match self {
            EntityKind::Graduation | EntityKind::FeeStructures => Backing::Memory,
            _ => Backing::Sqlite,
        }
    }

    pub fn attachment_field(self) -> Option<&'static str> {
        match self {
            EntityKind::Circulars => Some("attachment_url"),
            EntityKind::Verifications => Some("document_url"),
            EntityKind::Curricula => Some("syllabus_url"),
            _ => None,
        }
    }

    pub fn upload_folder(self) -> &'static str {
        match self {
            EntityKind::Circulars => "circulars",
            EntityKind::Verifications => "verification-documents",
            EntityKind::Curricula => "curriculum-syllabi",
            _ => "misc",
        }
    }

    pub fn status_field(self) -> &'static str {
        match self {
            EntityKind::Graduation => "eligibility_status",
            _ => "status",
        }
    }

    /// Values an imported row gets for columns it leaves empty.
    pub fn import_defaults(self) -> &'static [(&'static str, &'static str)] {
        match self {
            EntityKind::Students => &[("status", "active"), ("program", "B.Tech"), ("semester", "1")],
            EntityKind::Departments | EntityKind::Subjects | EntityKind::ProgramSections => &[("status", "active")],
            EntityKind::Circulars | EntityKind::Curricula | EntityKind::Examinations => &[("status", "draft")],
            _ => &[],
        }
    }

    pub fn status_toggle(self) -> Option<StatusToggle> {
        let (on, off) = match self {
            EntityKind::Departments
            | EntityKind::Students
            | EntityKind::Subjects
            | EntityKind::ProgramSections
            | EntityKind::FeeStructures => ("active", "inactive"),
            EntityKind::Circulars | EntityKind::Curricula | EntityKind::Examinations => ("published", "draft"),
            EntityKind::Graduation | EntityKind::Verifications => return None,
        };
        Some(StatusToggle {
            field: self.status_field(),
            on,
            off,
        })
    }

    pub fn view_schema(self, page_size: usize) -> ViewSchema {
        let (search_fields, facets, sort_keys, default_sort) = match self {
            EntityKind::Departments => (
                vec!["name", "code", "hod"],
                vec![
                    values_or("status", "Status", "status", "active"),
                    presence("hod_assigned", "HOD", "hod", "HOD Assigned", "No HOD"),
                    FacetDef {
                        key: "faculty_range",
                        label: "Faculty",
                        rule: FacetRule::Buckets {
                            field: "faculty_count",
                            buckets: FACULTY_BUCKETS,
                        },
                    },
                    presence("has_programs", "Programs", "programs_offered", "Has Programs", "No Programs"),
                ],
                vec![
                    key("name", "Department Name", "name", SortKind::Text),
                    key("code", "Department Code", "code", SortKind::Text),
                    key("facultyCount", "Faculty Count", "faculty_count", SortKind::Number),
                    key("studentCount", "Student Count", "student_count", SortKind::Number),
                    key("programCount", "Program Count", "programs_offered", SortKind::Count),
                    key("createdAt", "Date Created", "created_at", SortKind::Date),
                ],
                "name",
            ),
            EntityKind::Students => (
                vec!["name", "email", "roll_number", "contact_number"],
                vec![
                    values("department", "Department", "department"),
                    values("program", "Program", "program"),
                    values("semester", "Semester", "semester"),
                    values_or("status", "Status", "status", "active"),
                    range("cgpa", "CGPA", "cgpa"),
                ],
                vec![
                    key("name", "Name", "name", SortKind::Text),
                    key("rollNumber", "Roll Number", "roll_number", SortKind::Text),
                    key("semester", "Semester", "semester", SortKind::Number),
                    key("cgpa", "CGPA", "cgpa", SortKind::Number),
                    key("admissionDate", "Admission Date", "admission_date", SortKind::Date),
                ],
                "name",
            ),
            EntityKind::Circulars => (
                vec!["title", "audience", "message_body"],
                vec![
                    values_or("status", "Status", "status", "draft"),
                    values_or("priority", "Priority", "priority", "normal"),
                    values_or("category", "Category", "category", "general"),
                    presence("has_attachment", "Attachment", "attachment_url", "With Attachment", "No Attachment"),
                ],
                vec![
                    key("title", "Title", "title", SortKind::Text),
                    key("publishDate", "Publish Date", "publish_date", SortKind::Date),
                    key("expireDate", "Expiry Date", "expire_date", SortKind::Date),
                    key("createdAt", "Date Created", "created_at", SortKind::Date),
                ],
                "publishDate",
            ),
            EntityKind::Examinations => (
                vec!["name", "course_code", "course_name"],
                vec![
                    values("department", "Department", "department"),
                    values("exam_type", "Type", "exam_type"),
                    values("semester", "Semester", "semester"),
                    values_or("status", "Status", "status", "draft"),
                    range("pass_percentage", "Pass %", "pass_percentage"),
                ],
                vec![
                    key("name", "Name", "name", SortKind::Text),
                    key("examDate", "Exam Date", "exam_date", SortKind::Date),
                    key("totalMarks", "Total Marks", "total_marks", SortKind::Number),
                    key("passPercentage", "Pass %", "pass_percentage", SortKind::Number),
                ],
                "examDate",
            ),
            EntityKind::FeeStructures => (
                vec!["program", "category", "academic_year"],
                vec![
                    values("program", "Program", "program"),
                    values("category", "Category", "category"),
                    values("academic_year", "Academic Year", "academic_year"),
                    values_or("status", "Status", "status", "active"),
                    range("amount", "Amount", "amount"),
                ],
                vec![
                    key("program", "Program", "program", SortKind::Text),
                    key("amount", "Amount", "amount", SortKind::Number),
                    key("dueDate", "Due Date", "due_date", SortKind::Date),
                ],
                "program",
            ),
            EntityKind::Curricula => (
                vec!["course_name", "course_code", "program"],
                vec![
                    values("department", "Department", "department"),
                    values("program", "Program", "program"),
                    values("semester", "Semester", "semester"),
                    values_or("status", "Status", "status", "draft"),
                    presence("has_units", "Units", "units", "Has Units", "No Units"),
                ],
                vec![
                    key("courseName", "Course", "course_name", SortKind::Text),
                    key("courseCode", "Code", "course_code", SortKind::Text),
                    key("semester", "Semester", "semester", SortKind::Number),
                    key("unitCount", "Units", "units", SortKind::Count),
                    key("updatedAt", "Last Updated", "updated_at", SortKind::Date),
                ],
                "courseName",
            ),
            EntityKind::Graduation => (
                vec!["student_name", "roll_number", "program"],
                vec![
                    presence("eligible", "Eligibility", "eligible", "Eligible", "Not Eligible"),
                    values("program", "Program", "program"),
                    values("batch", "Batch", "batch"),
                    presence(
                        "library_clearance",
                        "Library Clearance",
                        "library_clearance",
                        "Cleared",
                        "Pending",
                    ),
                    range("cgpa", "CGPA", "cgpa"),
                ],
                vec![
                    key("studentName", "Student", "student_name", SortKind::Text),
                    key("eligible", "Eligibility", "eligible", SortKind::Flag),
                    key("cgpa", "CGPA", "cgpa", SortKind::Number),
                    key("creditsEarned", "Credits Earned", "credits_earned", SortKind::Number),
                ],
                "studentName",
            ),
            EntityKind::ProgramSections => (
                vec!["program", "section", "faculty"],
                vec![
                    values("program", "Program", "program"),
                    values("semester", "Semester", "semester"),
                    values("academic_year", "Academic Year", "academic_year"),
                    values_or("status", "Status", "status", "active"),
                    FacetDef {
                        key: "enrollment",
                        label: "Enrollment",
                        rule: FacetRule::Buckets {
                            field: "enrolled",
                            buckets: SEAT_BUCKETS,
                        },
                    },
                    presence("faculty_assigned", "Faculty", "faculty", "Faculty Assigned", "No Faculty"),
                ],
                vec![
                    key("program", "Program", "program", SortKind::Text),
                    key("section", "Section", "section", SortKind::Text),
                    key("semester", "Semester", "semester", SortKind::Number),
                    key("capacity", "Capacity", "capacity", SortKind::Number),
                    key("enrolled", "Enrolled", "enrolled", SortKind::Number),
                ],
                "program",
            ),
            EntityKind::Subjects => (
                vec!["name", "code", "department"],
                vec![
                    values("department", "Department", "department"),
                    values("subject_type", "Type", "subject_type"),
                    values_or("status", "Status", "status", "active"),
                    range("credits", "Credits", "credits"),
                ],
                vec![
                    key("name", "Subject", "name", SortKind::Text),
                    key("code", "Code", "code", SortKind::Text),
                    key("credits", "Credits", "credits", SortKind::Number),
                ],
                "name",
            ),
            EntityKind::Verifications => (
                vec!["student_name", "document_type", "roll_number"],
                vec![
                    values_or("status", "Status", "status", "pending"),
                    values("document_type", "Document", "document_type"),
                    presence("has_document", "File", "document_url", "Uploaded", "Missing"),
                ],
                vec![
                    key("studentName", "Student", "student_name", SortKind::Text),
                    key("submittedAt", "Submitted", "submitted_at", SortKind::Date),
                ],
                "submittedAt",
            ),
        };
        ViewSchema {
            search_fields,
            facets,
            sort_keys,
            default_sort,
            page_size,
        }
    }

    pub fn checks(self) -> &'static [Check] {
        match self {
            EntityKind::Departments => DEPARTMENT_CHECKS,
            EntityKind::Students => STUDENT_CHECKS,
            EntityKind::Circulars => CIRCULAR_CHECKS,
            EntityKind::Examinations => EXAM_CHECKS,
            EntityKind::FeeStructures => FEE_CHECKS,
            EntityKind::Curricula => CURRICULUM_CHECKS,
            EntityKind::Graduation => GRADUATION_CHECKS,
            EntityKind::ProgramSections => SECTION_CHECKS,
            EntityKind::Subjects => SUBJECT_CHECKS,
            EntityKind::Verifications => VERIFICATION_CHECKS,
        }
    }
}

const DEPARTMENT_CHECKS: &[Check] = &[
    Check::Required {
        field: "name",
        label: "Department name",
    },
    Check::Required {
        field: "code",
        label: "Department code",
    },
    Check::Email {
        field: "email",
        label: "Email",
    },
    Check::OneOf {
        field: "status",
        label: "Status",
        allowed: &["active", "inactive"],
    },
    Check::AtLeast {
        field: "faculty_count",
        label: "Faculty count",
        min: 0.0,
    },
];

const STUDENT_CHECKS: &[Check] = &[
    Check::Required {
        field: "name",
        label: "Name",
    },
    Check::Required {
        field: "email",
        label: "Email",
    },
    Check::Email {
        field: "email",
        label: "Email",
    },
    Check::Required {
        field: "roll_number",
        label: "Roll number",
    },
    Check::AtLeast {
        field: "semester",
        label: "Semester",
        min: 1.0,
    },
    Check::Between {
        field: "cgpa",
        label: "CGPA",
        min: 0.0,
        max: 10.0,
    },
];

const CIRCULAR_CHECKS: &[Check] = &[
    Check::Required {
        field: "title",
        label: "Title",
    },
    Check::RequiredWhen {
        field: "target_colleges",
        label: "Target colleges",
        when_field: "audience_type",
        when_value: "specific_colleges",
    },
    Check::Required {
        field: "publish_date",
        label: "Publish date",
    },
    Check::NotPast {
        field: "publish_date",
        label: "Publish date",
    },
    Check::After {
        field: "expire_date",
        label: "Expiry date",
        other: "publish_date",
        other_label: "Publish date",
    },
    Check::NotPast {
        field: "expire_date",
        label: "Expiry date",
    },
    Check::Required {
        field: "message_body",
        label: "Message body",
    },
    Check::OneOf {
        field: "priority",
        label: "Priority",
        allowed: &["normal", "high", "urgent"],
    },
];

const EXAM_CHECKS: &[Check] = &[
    Check::Required {
        field: "name",
        label: "Examination name",
    },
    Check::Required {
        field: "course_code",
        label: "Course code",
    },
    Check::Required {
        field: "exam_date",
        label: "Exam date",
    },
    Check::NotPast {
        field: "exam_date",
        label: "Exam date",
    },
    Check::AtLeast {
        field: "total_marks",
        label: "Total marks",
        min: 1.0,
    },
    Check::Between {
        field: "pass_percentage",
        label: "Pass percentage",
        min: 0.0,
        max: 100.0,
    },
];

const FEE_CHECKS: &[Check] = &[
    Check::Required {
        field: "program",
        label: "Program",
    },
    Check::Required {
        field: "academic_year",
        label: "Academic year",
    },
    Check::Required {
        field: "amount",
        label: "Amount",
    },
    Check::AtLeast {
        field: "amount",
        label: "Amount",
        min: 0.0,
    },
    Check::NotPast {
        field: "due_date",
        label: "Due date",
    },
    Check::Between {
        field: "late_fee_percentage",
        label: "Late fee percentage",
        min: 0.0,
        max: 100.0,
    },
];

const CURRICULUM_CHECKS: &[Check] = &[
    Check::Required {
        field: "course_code",
        label: "Course code",
    },
    Check::Required {
        field: "course_name",
        label: "Course name",
    },
    Check::Required {
        field: "program",
        label: "Program",
    },
    Check::AtLeast {
        field: "semester",
        label: "Semester",
        min: 1.0,
    },
    Check::AtLeast {
        field: "credits",
        label: "Credits",
        min: 1.0,
    },
];

const GRADUATION_CHECKS: &[Check] = &[
    Check::Required {
        field: "student_name",
        label: "Student name",
    },
    Check::Required {
        field: "roll_number",
        label: "Roll number",
    },
    Check::AtLeast {
        field: "credits_required",
        label: "Credits required",
        min: 1.0,
    },
    Check::AtLeast {
        field: "credits_earned",
        label: "Credits earned",
        min: 0.0,
    },
    Check::Between {
        field: "cgpa",
        label: "CGPA",
        min: 0.0,
        max: 10.0,
    },
];

const SECTION_CHECKS: &[Check] = &[
    Check::Required {
        field: "program",
        label: "Program",
    },
    Check::Required {
        field: "section",
        label: "Section",
    },
    Check::AtLeast {
        field: "semester",
        label: "Semester",
        min: 1.0,
    },
    Check::AtLeast {
        field: "capacity",
        label: "Capacity",
        min: 1.0,
    },
    Check::AtLeast {
        field: "enrolled",
        label: "Enrolled",
        min: 0.0,
    },
];

const SUBJECT_CHECKS: &[Check] = &[
    Check::Required {
        field: "name",
        label: "Subject name",
    },
    Check::Required {
        field: "code",
        label: "Subject code",
    },
    Check::AtLeast {
        field: "credits",
        label: "Credits",
        min: 1.0,
    },
    Check::OneOf {
        field: "subject_type",
        label: "Subject type",
        allowed: &["core", "elective", "lab", "project"],
    },
];

const VERIFICATION_CHECKS: &[Check] = &[
    Check::Required {
        field: "student_name",
        label: "Student name",
    },
    Check::Required {
        field: "document_type",
        label: "Document type",
    },
    Check::OneOf {
        field: "status",
        label: "Status",
        allowed: &["pending", "approved", "rejected"],
    },
];

fn text_list(items: &[&str]) -> FieldValue {
    FieldValue::List(items.iter().map(|s| FieldValue::from(*s)).collect())
}

/// Fixture rows for the in-memory collections.
pub fn seed(kind: EntityKind) -> Vec<Record> {
    match kind {
        EntityKind::Graduation => vec![
            Record::new("grad-2025-001")
                .with("student_name", "Ananya Iyer")
                .with("roll_number", "CS21001")
                .with("program", "B.Tech CSE")
                .with("batch", "2021-2025")
                .with("credits_earned", 160i64)
                .with("credits_required", 160i64)
                .with("cgpa", 8.7)
                .with("eligible", true)
                .with("eligibility_status", "eligible")
                .with("library_clearance", true),
            Record::new("grad-2025-002")
                .with("student_name", "Rahul Menon")
                .with("roll_number", "CS21014")
                .with("program", "B.Tech CSE")
                .with("batch", "2021-2025")
                .with("credits_earned", 148i64)
                .with("credits_required", 160i64)
                .with("cgpa", 7.1)
                .with("eligible", false)
                .with("eligibility_status", "pending_credits")
                .with("library_clearance", true),
            Record::new("grad-2025-003")
                .with("student_name", "Fatima Sheikh")
                .with("roll_number", "EC21007")
                .with("program", "B.Tech ECE")
                .with("batch", "2021-2025")
                .with("credits_earned", 162i64)
                .with("credits_required", 160i64)
                .with("cgpa", 9.2)
                .with("eligible", true)
                .with("eligibility_status", "eligible")
                .with("library_clearance", false),
            Record::new("grad-2025-004")
                .with("student_name", "Karthik Reddy")
                .with("roll_number", "ME20031")
                .with("program", "B.Tech ME")
                .with("batch", "2020-2024")
                .with("credits_earned", 158i64)
                .with("credits_required", 160i64)
                .with("cgpa", 6.4)
                .with("eligible", false)
                .with("eligibility_status", "pending_credits")
                .with("library_clearance", false),
        ],
        EntityKind::FeeStructures => vec![
            Record::new("fee-001")
                .with("program", "B.Tech CSE")
                .with("category", "tuition")
                .with("academic_year", "2025-26")
                .with("semester", 1i64)
                .with("amount", 85000i64)
                .with("due_date", "2025-07-31")
                .with("status", "active")
                .with("components", text_list(&["tuition", "lab", "library"])),
            Record::new("fee-002")
                .with("program", "B.Tech ECE")
                .with("category", "tuition")
                .with("academic_year", "2025-26")
                .with("semester", 1i64)
                .with("amount", 82000i64)
                .with("due_date", "2025-07-31")
                .with("status", "active")
                .with("components", text_list(&["tuition", "lab"])),
            Record::new("fee-003")
                .with("program", "MBA")
                .with("category", "hostel")
                .with("academic_year", "2025-26")
                .with("semester", 1i64)
                .with("amount", 45000i64)
                .with("due_date", "2025-08-15")
                .with("status", "inactive")
                .with("components", text_list(&["hostel", "mess"])),
        ],
        _ => Vec::new(),
    }
}
