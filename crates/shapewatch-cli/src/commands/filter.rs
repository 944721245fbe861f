use crate::cli::FilterCommands;
use crate::config::Config;
use crate::support::{block_on_or_exit, ok_or_exit, print_json, service_or_exit};
use serde_json::json;
use shapewatch_filters::{Combinator, FilterInput, FilterResource, FilterTree, TreeChild};

pub fn run(command: FilterCommands, config: &Config) {
    match command {
        FilterCommands::Add {
            require_all,
            constraints,
            sub_filters,
            email,
            id,
            json,
        } => run_add(
            FilterInput {
                require_all,
                constraints,
                sub_filters,
            },
            id,
            email,
            config,
            json,
        ),

        FilterCommands::Show { id, tree, json } => {
            if tree {
                run_show_tree(id, config, json)
            } else {
                run_show(id, config, json)
            }
        }

        FilterCommands::Replace {
            id,
            require_all,
            constraints,
            sub_filters,
            json,
        } => run_replace(
            id,
            FilterInput {
                require_all,
                constraints,
                sub_filters,
            },
            config,
            json,
        ),

        FilterCommands::Delete { id, json } => run_delete(id, config, json),
    }
}

fn run_add(
    input: FilterInput,
    id: Option<String>,
    email: Option<String>,
    config: &Config,
    json_output: bool,
) {
    let service = service_or_exit(config);
    let created = ok_or_exit(
        block_on_or_exit(service.create_filter(id.as_deref(), &input, email.as_deref())),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "filter.add",
            "filter": created.filter,
            "subscriber": created.subscriber,
        }));
        return;
    }

    println!("shapewatch filter add");
    println!("  Added: {}", created.filter.id);
    print_resource(&created.filter);
    if let Some(link) = created.subscriber {
        let state = if link.created { "new" } else { "existing" };
        println!(
            "  Subscriber: {} ({state}, {})",
            link.subscriber.id, link.subscriber.email
        );
    }
}

fn run_show(id: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let filter = ok_or_exit(block_on_or_exit(service.filter(&id)), json_output);

    if json_output {
        print_json(&json!({
            "action": "filter.show",
            "filter": filter,
        }));
    } else {
        println!("shapewatch filter show");
        println!("  ID: {}", filter.id);
        print_resource(&filter);
    }
}

fn run_show_tree(id: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let tree = ok_or_exit(block_on_or_exit(service.filter_tree(&id)), json_output);

    if json_output {
        print_json(&json!({
            "action": "filter.tree",
            "tree": tree,
        }));
    } else {
        println!("shapewatch filter show --tree");
        let mut lines = Vec::new();
        render_tree(&tree, 1, &mut lines);
        for line in lines {
            println!("{line}");
        }
    }
}

fn run_replace(id: String, input: FilterInput, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let filter = ok_or_exit(
        block_on_or_exit(service.replace_filter(&id, &input)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "filter.replace",
            "filter": filter,
        }));
    } else {
        println!("shapewatch filter replace");
        println!("  Replaced: {}", filter.id);
        print_resource(&filter);
    }
}

fn run_delete(id: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    ok_or_exit(block_on_or_exit(service.delete_filter(&id)), json_output);

    if json_output {
        print_json(&json!({
            "action": "filter.delete",
            "id": id,
        }));
    } else {
        println!("shapewatch filter delete");
        println!("  Deleted: {id}");
    }
}

fn print_resource(filter: &FilterResource) {
    let combinator = Combinator::from_require_all(filter.require_all);
    println!("  Combinator: {}", combinator_label(combinator));
    if !filter.constraints.is_empty() {
        println!("  Constraints: {}", filter.constraints.join(", "));
    }
    if !filter.sub_filters.is_empty() {
        println!("  Sub-filters: {}", filter.sub_filters.join(", "));
    }
}

fn combinator_label(combinator: Combinator) -> &'static str {
    match combinator {
        Combinator::All => "ALL",
        Combinator::Any => "ANY",
    }
}

fn render_tree(tree: &FilterTree, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    lines.push(format!("{indent}{} [{}]", tree.id, combinator_label(tree.combinator)));
    for child in &tree.children {
        match child {
            TreeChild::Filter(sub) => render_tree(sub, depth + 1, lines),
            TreeChild::Constraint(c) => lines.push(format!(
                "{indent}  {}: {} {} {:?}",
                c.id,
                c.subject.as_str(),
                c.predicate,
                c.object
            )),
            TreeChild::Dangling(reference) => lines.push(format!(
                "{indent}  {} (missing {})",
                reference.id, reference.kind
            )),
        }
    }
}
