mod logging;
mod render;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use sqlite_adapter::open_gateway_from_env;
use staffdesk_core::utils::{normalize_employee_number, parse_salary};
use staffdesk_core::{Employee, EmployeeGateway};
use tracing::info;

const PROMOTED_EMPLOYEE: &str = "E8";
const PROMOTED_NAME: &str = "Guy";
const PROMOTED_SALARY: f64 = 1000000.0;

/// Manage employee records stored behind the employee procedures
#[derive(Parser, Debug)]
#[command(name = "staffdesk")]
#[command(about = "Lists, adds, updates and deletes employee records")]
struct Cli {
    /// Path to the SQLite database; overrides STAFFDESK_DATABASE
    #[arg(short = 'd', long = "database", global = true)]
    database: Option<PathBuf>,

    /// Log every procedure call
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Without a command, employee E8 is renamed to Guy with a salary of 1000000.0
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Show all employees
    List,
    /// Show one employee
    Show { employee_number: String },
    /// Add a new employee
    Add {
        employee_number: String,
        name: String,
        #[arg(allow_negative_numbers = true)]
        salary: String,
    },
    /// Replace name and salary of an existing employee
    Update {
        employee_number: String,
        name: String,
        #[arg(allow_negative_numbers = true)]
        salary: String,
    },
    /// Delete an employee
    Delete { employee_number: String },
    /// Show employees together with their departments
    Departments,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let gateway = open_gateway_from_env(cli.database)?;

    match cli.command {
        None => promote(&gateway),
        Some(Command::List) => list(&gateway),
        Some(Command::Show { employee_number }) => {
            let employee_number = employee_number_arg(&employee_number)?;
            match gateway.fetch_by_number(&employee_number)? {
                Some(employee) => println!("{}", render::employee_summary(&employee)),
                None => println!("No employee with employee number {employee_number}"),
            }
            Ok(())
        }
        Some(Command::Add {
            employee_number,
            name,
            salary,
        }) => {
            let employee = employee_arg(&employee_number, name, &salary)?;
            gateway.save(&employee)?;
            info!(employee_number = %employee.employee_number, "employee added");
            list(&gateway)
        }
        Some(Command::Update {
            employee_number,
            name,
            salary,
        }) => {
            let employee = employee_arg(&employee_number, name, &salary)?;
            gateway.update(&employee)?;
            info!(employee_number = %employee.employee_number, "employee updated");
            list(&gateway)
        }
        Some(Command::Delete { employee_number }) => {
            let employee_number = employee_number_arg(&employee_number)?;
            gateway.delete_by_number(&employee_number)?;
            info!(%employee_number, "employee deleted");
            list(&gateway)
        }
        Some(Command::Departments) => {
            let employees = gateway.fetch_all_with_departments()?;
            println!("{}", render::department_table(&employees));
            Ok(())
        }
    }
}

/// Renames E8 to Guy, raises the salary, then prints the stored record.
fn promote(gateway: &EmployeeGateway) -> anyhow::Result<()> {
    let mut employee = gateway
        .fetch_by_number(PROMOTED_EMPLOYEE)?
        .ok_or_else(|| anyhow!("No employee with employee number {PROMOTED_EMPLOYEE}"))?;

    employee.name = PROMOTED_NAME.to_string();
    employee.salary = PROMOTED_SALARY;
    gateway.update(&employee)?;

    let updated = gateway
        .fetch_by_number(PROMOTED_EMPLOYEE)?
        .ok_or_else(|| anyhow!("Employee {PROMOTED_EMPLOYEE} disappeared after update"))?;
    println!("{}", render::employee_summary(&updated));
    Ok(())
}

fn list(gateway: &EmployeeGateway) -> anyhow::Result<()> {
    let employees = gateway.fetch_all()?;
    println!("{}", render::employee_table(&employees));
    Ok(())
}

fn employee_number_arg(input: &str) -> anyhow::Result<String> {
    match normalize_employee_number(input) {
        Some(number) => Ok(number),
        None => bail!("Employee number must not be empty."),
    }
}

fn employee_arg(employee_number: &str, name: String, salary: &str) -> anyhow::Result<Employee> {
    let employee_number = employee_number_arg(employee_number)?;
    let salary = parse_salary(salary).with_context(|| format!("salary {salary:?}"))?;
    Ok(Employee::new(employee_number, name, salary))
}
