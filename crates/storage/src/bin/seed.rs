use std::fmt;

use chrono::{DateTime, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use setu_core::model::{
    Course, CourseId, CourseLevel, Lesson, LessonId, McqOption, McqQuestion, QuestionId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_slug: String,
    course_title: String,
    lessons: u32,
    questions_per_lesson: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLessons { raw: String },
    InvalidQuestions { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidQuestions { raw } => {
                write!(f, "invalid --questions value: {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("SETU_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut course_slug =
            std::env::var("SETU_COURSE_SLUG").unwrap_or_else(|_| "intro-to-programming".into());
        let mut course_title = std::env::var("SETU_COURSE_TITLE")
            .unwrap_or_else(|_| "Introduction to Programming".into());
        let mut lessons = std::env::var("SETU_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(4);
        let mut questions_per_lesson = std::env::var("SETU_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--slug" => {
                    course_slug = require_value(&mut args, "--slug")?;
                }
                "--title" => {
                    course_title = require_value(&mut args, "--title")?;
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions_per_lesson = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_slug,
            course_title,
            lessons,
            questions_per_lesson,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --slug <slug>             Course slug (default: intro-to-programming)");
    eprintln!("  --title <title>           Course title (default: Introduction to Programming)");
    eprintln!("  --lessons <n>             Number of sample lessons (default: 4)");
    eprintln!("  --questions <n>           MCQ questions per lesson (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  SETU_DB_URL, SETU_COURSE_SLUG, SETU_COURSE_TITLE, SETU_LESSONS, SETU_QUESTIONS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let course = Course::new(
        CourseId::new(1),
        args.course_slug.clone(),
        args.course_title.clone(),
        Some("Seeded demo course.".into()),
        CourseLevel::Beginner,
        None,
        now,
    )?;
    storage.courses.upsert_course(&course).await?;

    let lesson_titles = [
        "Getting Started",
        "Variables and Types",
        "Control Flow",
        "Functions",
        "Collections",
    ];
    for i in 0..args.lessons {
        let idx = (i as usize) % lesson_titles.len();
        let lesson = Lesson::new(
            LessonId::new(u64::from(i + 1)),
            course.id(),
            lesson_titles[idx],
            None,
            i,
            600,
            Some("dQw4w9WgXcQ"),
            i == 0,
            now,
        )?;
        storage.courses.upsert_lesson(&lesson).await?;

        for q in 0..args.questions_per_lesson {
            let question = McqQuestion::new(
                QuestionId::new(u64::from(i) * 100 + u64::from(q) + 1),
                lesson.id(),
                format!("Checkpoint {} for {}?", q + 1, lesson_titles[idx]),
                [
                    "First option".into(),
                    "Second option".into(),
                    "Third option".into(),
                    "Fourth option".into(),
                ],
                McqOption::A,
                "The first option is correct in the seeded data.",
                q,
                now,
            )?;
            storage.questions.upsert_question(&question).await?;
        }
    }

    info!(
        slug = %args.course_slug,
        lessons = args.lessons,
        questions_per_lesson = args.questions_per_lesson,
        db = %args.db_url,
        "seeded course"
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
