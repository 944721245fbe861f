use crate::cli::ConstraintCommands;
use crate::config::Config;
use crate::support::{block_on_or_exit, ok_or_exit, print_json, service_or_exit};
use serde_json::json;
use shapewatch_filters::{Constraint, ConstraintInput};

pub fn run(command: ConstraintCommands, config: &Config) {
    match command {
        ConstraintCommands::Add {
            subject,
            predicate,
            object,
            id,
            json,
        } => run_add(
            ConstraintInput::new(subject, predicate, object),
            id,
            config,
            json,
        ),

        ConstraintCommands::Show { id, json } => run_show(id, config, json),

        ConstraintCommands::Replace {
            id,
            subject,
            predicate,
            object,
            json,
        } => run_replace(
            id,
            ConstraintInput::new(subject, predicate, object),
            config,
            json,
        ),

        ConstraintCommands::Delete { id, json } => run_delete(id, config, json),
    }
}

fn run_add(input: ConstraintInput, id: Option<String>, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let constraint = ok_or_exit(
        block_on_or_exit(service.create_constraint(id.as_deref(), &input)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "constraint.add",
            "constraint": constraint,
        }));
    } else {
        println!("shapewatch constraint add");
        println!("  Added: {}", constraint.id);
        print_constraint(&constraint);
    }
}

fn run_show(id: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let constraint = ok_or_exit(block_on_or_exit(service.constraint(&id)), json_output);

    if json_output {
        print_json(&json!({
            "action": "constraint.show",
            "constraint": constraint,
        }));
    } else {
        println!("shapewatch constraint show");
        println!("  ID: {}", constraint.id);
        print_constraint(&constraint);
    }
}

fn run_replace(id: String, input: ConstraintInput, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let constraint = ok_or_exit(
        block_on_or_exit(service.replace_constraint(&id, &input)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "constraint.replace",
            "constraint": constraint,
        }));
    } else {
        println!("shapewatch constraint replace");
        println!("  Replaced: {}", constraint.id);
        print_constraint(&constraint);
    }
}

fn run_delete(id: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    ok_or_exit(block_on_or_exit(service.delete_constraint(&id)), json_output);

    if json_output {
        print_json(&json!({
            "action": "constraint.delete",
            "id": id,
        }));
    } else {
        println!("shapewatch constraint delete");
        println!("  Deleted: {id}");
    }
}

fn print_constraint(constraint: &Constraint) {
    println!("  Field: {}", constraint.subject.as_str());
    println!("  Operator: {}", constraint.predicate);
    if !constraint.object.is_empty() {
        println!("  Value: {}", constraint.object);
    }
}
