use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, products};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};

#[derive(Parser, Debug)]
#[command(name = "verkstad_admin")]
#[command(about = "Admin utilities for Verkstad (bootstrap members/allocation rules)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./verkstad.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Member(Member),
    Product(Product),
    Allocation(Allocation),
}

#[derive(Args, Debug)]
struct Member {
    #[command(subcommand)]
    command: MemberCommand,
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Create(MemberCreateArgs),
}

#[derive(Args, Debug)]
struct MemberCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    firstname: String,
    #[arg(long)]
    lastname: String,
    /// Allow this member to request and download accounting exports.
    #[arg(long)]
    export_permission: bool,
}

#[derive(Args, Debug)]
struct Product {
    #[command(subcommand)]
    command: ProductCommand,
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    Create(ProductCreateArgs),
}

#[derive(Args, Debug)]
struct ProductCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct Allocation {
    #[command(subcommand)]
    command: AllocationCommand,
}

#[derive(Subcommand, Debug)]
enum AllocationCommand {
    Add(AllocationAddArgs),
}

#[derive(Args, Debug)]
struct AllocationAddArgs {
    #[arg(long)]
    product_id: i32,
    /// BAS account number, e.g. 3001.
    #[arg(long)]
    account: i32,
    #[arg(long)]
    cost_center: String,
    /// Fraction of the product's revenue, e.g. 0.4. All fractions of a
    /// product must sum to 1.
    #[arg(long)]
    fraction: String,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::Member(Member {
            command: MemberCommand::Create(args),
        }) => {
            if engine.member_by_username(&args.username).await?.is_some() {
                eprintln!("member already exists: {}", args.username);
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;
            let member = engine
                .create_member(
                    &args.username,
                    &password,
                    &args.firstname,
                    &args.lastname,
                    args.export_permission,
                )
                .await?;

            println!("created member: {} (id {})", member.username, member.id);
        }
        Command::Product(Product {
            command: ProductCommand::Create(args),
        }) => {
            let product = products::ActiveModel {
                name: Set(args.name.clone()),
                ..Default::default()
            };
            let result = products::Entity::insert(product).exec(&db).await?;

            println!("created product: {} (id {})", args.name, result.last_insert_id);
        }
        Command::Allocation(Allocation {
            command: AllocationCommand::Add(args),
        }) => {
            let fraction: Decimal = match args.fraction.parse() {
                Ok(v) => v,
                Err(_) => {
                    eprintln!("invalid fraction: {}", args.fraction);
                    std::process::exit(2);
                }
            };

            let rule = engine
                .add_allocation_rule(args.product_id, args.account, &args.cost_center, fraction)
                .await?;

            println!(
                "added allocation rule {} for product {}: {} -> account {} / {}",
                rule.id, args.product_id, args.fraction, args.account, args.cost_center
            );
        }
    }

    Ok(())
}
