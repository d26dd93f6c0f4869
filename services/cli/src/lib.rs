mod cli;
mod commands;
mod demo;
mod infra;

use credit_decision::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
