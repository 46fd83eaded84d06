use clap::{Parser, Subcommand};
use eduflow::Config;
use eduflow::model::entity::{
    Lesson, LessonCreate, Module, ModuleCreate, Session, UserEntity, UserEntityCreateUpdate,
};
use eduflow::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use eduflow::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for filling and maintaining the eduflow DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Manage login sessions
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        full_name: String,
        #[arg(long, default_value = "student", value_parser = ["student", "teacher", "admin"])]
        role: String,
    },
}

/// Module management
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
        /// External quiz form, requires `--quiz-total-items`
        #[arg(long, requires = "quiz_total_items")]
        quiz_url: Option<String>,
        #[arg(long, requires = "quiz_url")]
        quiz_total_items: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Delete expired sessions
    Purge,
}

#[tokio::main]
async fn main() -> eduflow::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_uri = match std::env::var("DATABASE_URL") {
        Ok(uri) => uri,
        Err(_) => Config::get_or_init(true).await.app().database_uri().to_string(),
    };

    let db_con = DbConnection::connect(&database_uri)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                password,
                full_name,
                role,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        full_name,
                        password_hash: eduflow::auth::hash_password(&password)?,
                        role: UserRole::from(role.as_str()),
                    },
                )
                .await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add {
                title,
                description,
                order_index,
            } => {
                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        title,
                        description,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                module_title,
                title,
                file,
                order_index,
                quiz_url,
                quiz_total_items,
            } => {
                let module_id: uuid::Uuid =
                    sqlx::query_scalar("SELECT id FROM modules WHERE title = $1")
                        .bind(&module_title)
                        .fetch_one(mm.executor())
                        .await
                        .map_err(DatabaseError::SqlxError)?;

                let content = std::fs::read_to_string(file)?;
                let data = LessonCreate {
                    module_id,
                    title,
                    content,
                    order_index: Some(order_index),
                    quiz_url,
                    quiz_total_items,
                };
                if !data.is_valid() {
                    eprintln!("Lesson title cannot be empty and quiz total items must be positive.");
                    std::process::exit(2);
                }

                let lesson = Lesson::create(&mm, &actor, data).await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Sessions { action } => match action {
            SessionCommands::Purge => {
                let removed = Session::cleanup_expired(&mm).await?;
                println!("Sessions removed: {}", removed);
            }
        },
    }

    Ok(())
}
