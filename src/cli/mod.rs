use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{ApiResponse, AppError, LedgerService};
use crate::domain::{format_cents, Instructor, InstructorUpdate, Student};

/// Patente - driving school ledger and capacity accounting
#[derive(Parser)]
#[command(name = "patente")]
#[command(about = "Ledger and capacity-accounting backend for driving school administration")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "patente.db")]
    pub database: String,

    /// Emit structured JSON envelopes instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Instructor management commands
    #[command(subcommand)]
    Instructor(InstructorCommands),

    /// Student management commands
    #[command(subcommand)]
    Student(StudentCommands),

    /// Record a payment for a payer
    Pay {
        /// Payer kind: instructor or student
        kind: String,

        /// Payer id
        id: String,

        /// Debit amount (e.g., "150.50" or "80")
        amount: String,

        /// Lessons settled by this payment (instructors only)
        #[arg(long, default_value_t = 0)]
        lessons: i64,

        /// Free-text note on the entry
        #[arg(long)]
        note: Option<String>,
    },

    /// Show a payer's payment history, newest first
    History {
        /// Payer kind: instructor or student
        kind: String,

        /// Payer id
        id: String,
    },

    /// List instructors at or below an assignment-count threshold
    Capacity {
        /// Maximum assignment count to still be considered available
        #[arg(long, default_value_t = 5)]
        threshold: i64,
    },

    /// Aggregation reports over payment history
    #[command(subcommand)]
    Report(ReportCommands),

    /// Link a student to an instructor
    Assign {
        /// Student id
        student: String,

        /// Instructor id
        instructor: String,
    },

    /// Remove an assignment link
    Unassign {
        /// Assignment id
        id: String,
    },

    /// List all assignment links
    Assignments,
}

#[derive(Subcommand)]
pub enum InstructorCommands {
    /// Register a new instructor
    Add {
        first_name: String,
        last_name: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        hired_as: Option<String>,

        #[arg(long)]
        dob: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        licence: Option<String>,

        #[arg(long)]
        di_number: Option<String>,

        /// Prepaid lessons to start the counter with
        #[arg(long, default_value_t = 0)]
        lessons: i64,
    },

    /// List all instructors
    List,

    /// Show one instructor
    Show { id: String },

    /// Update an instructor's profile fields
    Update {
        id: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        dob: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        licence: Option<String>,

        #[arg(long)]
        di_number: Option<String>,
    },

    /// Remove an instructor
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum StudentCommands {
    /// Register a new student
    Add {
        first_name: String,
        last_name: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        dob: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        supportive_id: Option<String>,
    },

    /// List all students
    List,

    /// Show one student
    Show { id: String },

    /// Remove a student
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Payment totals per instructor (only instructors with entries)
    Instructors,

    /// Total paid by one student
    Student { id: String },
}

fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("Invalid id '{}'", input))
}

/// Render a service result either as a JSON envelope or through the
/// given human-readable printer.
fn emit<T: Serialize>(
    json: bool,
    message: &str,
    result: Result<T, AppError>,
    render: impl FnOnce(&T),
) -> Result<()> {
    if json {
        println!("{}", ApiResponse::from_result(message, result).to_json());
        Ok(())
    } else {
        let payload = result?;
        render(&payload);
        Ok(())
    }
}

fn print_instructor(instructor: &Instructor) {
    println!(
        "{}  {}  lessons remaining: {}",
        instructor.id,
        instructor.full_name(),
        instructor.lessons_remaining
    );
}

fn print_student(student: &Student) {
    println!("{}  {}", student.id, student.full_name());
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Instructor(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_instructor_command(&service, cmd, self.json).await?;
            }

            Commands::Student(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_student_command(&service, cmd, self.json).await?;
            }

            Commands::Pay {
                kind,
                id,
                amount,
                lessons,
                note,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let result = match LedgerService::parse_payer(&kind, &id) {
                    Ok(payer) => service.record_payment(payer, &amount, lessons, note).await,
                    Err(err) => Err(err),
                };
                emit(self.json, "Payment recorded", result, |entry| {
                    println!(
                        "Recorded payment of {} for {} {} (balance {})",
                        format_cents(entry.amount_cents),
                        entry.payer_kind,
                        entry.payer_id,
                        format_cents(entry.running_balance_cents)
                    );
                })?;
            }

            Commands::History { kind, id } => {
                let service = LedgerService::connect(&self.database).await?;
                let result = match LedgerService::parse_payer(&kind, &id) {
                    Ok(payer) => service.payment_history(payer).await,
                    Err(err) => Err(err),
                };
                emit(self.json, "Payment history retrieved", result, |entries| {
                    if entries.is_empty() {
                        println!("No payments recorded.");
                    }
                    for entry in entries {
                        println!(
                            "{}  amount {}  lessons {}  balance {}  {}",
                            entry.created_at.format("%Y-%m-%d %H:%M"),
                            format_cents(entry.amount_cents),
                            entry.lessons_settled,
                            format_cents(entry.running_balance_cents),
                            entry.note.as_deref().unwrap_or("")
                        );
                    }
                })?;
            }

            Commands::Capacity { threshold } => {
                let service = LedgerService::connect(&self.database).await?;
                let result = service.list_under_capacity(threshold).await;
                emit(self.json, "Instructors retrieved", result, |instructors| {
                    if instructors.is_empty() {
                        println!("No instructors at or below {} assignments.", threshold);
                    }
                    for instructor in instructors {
                        print_instructor(instructor);
                    }
                })?;
            }

            Commands::Report(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_report_command(&service, cmd, self.json).await?;
            }

            Commands::Assign {
                student,
                instructor,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let student_id = parse_id(&student)?;
                let instructor_id = parse_id(&instructor)?;
                let result = service.assign_student(student_id, instructor_id).await;
                emit(self.json, "Student assigned", result, |assignment| {
                    println!(
                        "Assigned student {} to instructor {} ({})",
                        assignment.student_id, assignment.instructor_id, assignment.id
                    );
                })?;
            }

            Commands::Unassign { id } => {
                let service = LedgerService::connect(&self.database).await?;
                let assignment_id = parse_id(&id)?;
                let result = service.unassign(assignment_id).await;
                emit(self.json, "Assignment removed", result, |_| {
                    println!("Assignment removed: {}", assignment_id);
                })?;
            }

            Commands::Assignments => {
                let service = LedgerService::connect(&self.database).await?;
                let result = service.list_assignments().await;
                emit(self.json, "Assignments retrieved", result, |assignments| {
                    if assignments.is_empty() {
                        println!("No assignments.");
                    }
                    for assignment in assignments {
                        println!(
                            "{}  student {} -> instructor {}",
                            assignment.id, assignment.student_id, assignment.instructor_id
                        );
                    }
                })?;
            }
        }

        Ok(())
    }
}

async fn run_instructor_command(
    service: &LedgerService,
    cmd: InstructorCommands,
    json: bool,
) -> Result<()> {
    match cmd {
        InstructorCommands::Add {
            first_name,
            last_name,
            phone,
            email,
            address,
            hired_as,
            dob,
            gender,
            licence,
            di_number,
            lessons,
        } => {
            let mut instructor = Instructor::new(first_name, last_name)
                .with_contact(phone, email, address)
                .with_licence(licence, di_number)
                .with_lessons_remaining(lessons);
            instructor.hired_as = hired_as;
            instructor.dob = dob;
            instructor.gender = gender;

            let result = service.add_instructor(instructor).await;
            emit(json, "Instructor added", result, |instructor| {
                println!("Added instructor {} ({})", instructor.full_name(), instructor.id);
            })
        }

        InstructorCommands::List => {
            let result = service.list_instructors().await;
            emit(json, "Instructors retrieved", result, |instructors| {
                if instructors.is_empty() {
                    println!("No instructors.");
                }
                for instructor in instructors {
                    print_instructor(instructor);
                }
            })
        }

        InstructorCommands::Show { id } => {
            let id = parse_id(&id)?;
            let result = service.get_instructor(id).await;
            emit(json, "Instructor found", result, |instructor| {
                print_instructor(instructor);
                if let Some(email) = &instructor.email {
                    println!("  email: {}", email);
                }
                if let Some(phone) = &instructor.phone {
                    println!("  phone: {}", phone);
                }
                if let Some(licence) = &instructor.licence_number {
                    println!("  licence: {}", licence);
                }
            })
        }

        InstructorCommands::Update {
            id,
            first_name,
            last_name,
            phone,
            email,
            address,
            dob,
            gender,
            licence,
            di_number,
        } => {
            let id = parse_id(&id)?;
            let update = InstructorUpdate {
                first_name,
                last_name,
                phone,
                email,
                address,
                dob,
                gender,
                licence_number: licence,
                di_number,
            };
            let result = service.update_instructor(id, update).await;
            emit(json, "Instructor updated", result, |instructor| {
                println!("Updated instructor {} ({})", instructor.full_name(), instructor.id);
            })
        }

        InstructorCommands::Remove { id } => {
            let id = parse_id(&id)?;
            let result = service.remove_instructor(id).await;
            emit(json, "Instructor removed", result, |_| {
                println!("Instructor removed: {}", id);
            })
        }
    }
}

async fn run_student_command(
    service: &LedgerService,
    cmd: StudentCommands,
    json: bool,
) -> Result<()> {
    match cmd {
        StudentCommands::Add {
            first_name,
            last_name,
            phone,
            email,
            address,
            dob,
            gender,
            supportive_id,
        } => {
            let mut student = Student::new(first_name, last_name).with_contact(phone, email, address);
            student.dob = dob;
            student.gender = gender;
            student.supportive_id = supportive_id;

            let result = service.add_student(student).await;
            emit(json, "Student added", result, |student| {
                println!("Added student {} ({})", student.full_name(), student.id);
            })
        }

        StudentCommands::List => {
            let result = service.list_students().await;
            emit(json, "Students retrieved", result, |students| {
                if students.is_empty() {
                    println!("No students.");
                }
                for student in students {
                    print_student(student);
                }
            })
        }

        StudentCommands::Show { id } => {
            let id = parse_id(&id)?;
            let result = service.get_student(id).await;
            emit(json, "Student found", result, |student| {
                print_student(student);
                if let Some(email) = &student.email {
                    println!("  email: {}", email);
                }
                if let Some(phone) = &student.phone {
                    println!("  phone: {}", phone);
                }
            })
        }

        StudentCommands::Remove { id } => {
            let id = parse_id(&id)?;
            let result = service.remove_student(id).await;
            emit(json, "Student removed", result, |_| {
                println!("Student removed: {}", id);
            })
        }
    }
}

async fn run_report_command(service: &LedgerService, cmd: ReportCommands, json: bool) -> Result<()> {
    match cmd {
        ReportCommands::Instructors => {
            let result = service.summarize_instructor_payments().await;
            emit(json, "Instructor payments retrieved", result, |summaries| {
                if summaries.is_empty() {
                    println!("No instructor payments recorded.");
                }
                for summary in summaries {
                    println!(
                        "{}  {}  lessons paid: {}  compensation: {}",
                        summary.instructor.id,
                        summary.instructor.full_name(),
                        summary.total_lessons_paid,
                        format_cents(summary.total_compensation_cents)
                    );
                }
            })
        }

        ReportCommands::Student { id } => {
            let id = parse_id(&id)?;
            let result = service.summarize_student_payment_total(id).await;
            emit(json, "Student payment sum retrieved", result, |total| {
                if total.has_records() {
                    println!(
                        "Student {} paid {} across {} payment(s)",
                        total.student_id,
                        format_cents(total.total_cents),
                        total.entry_count
                    );
                } else {
                    println!("No payment records for student {}", total.student_id);
                }
            })
        }
    }
}
