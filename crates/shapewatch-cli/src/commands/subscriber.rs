use crate::cli::SubscriberCommands;
use crate::config::Config;
use crate::support::{block_on_or_exit, ok_or_exit, print_json, service_or_exit};
use serde_json::json;

pub fn run(command: SubscriberCommands, config: &Config) {
    match command {
        SubscriberCommands::Subscribe {
            email,
            filter,
            json,
        } => run_subscribe(email, filter, config, json),

        SubscriberCommands::Filters { token, json } => run_filters(token, config, json),

        SubscriberCommands::Unsubscribe {
            token,
            filter,
            json,
        } => run_unsubscribe(token, filter, config, json),
    }
}

fn run_subscribe(email: String, filter: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let link = ok_or_exit(
        block_on_or_exit(service.subscribe(&email, &filter)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "subscriber.subscribe",
            "filter": filter,
            "subscriber": link,
        }));
    } else {
        println!("shapewatch subscriber subscribe");
        println!("  Subscriber: {} ({})", link.subscriber.id, link.subscriber.email);
        println!("  Filter: {filter}");
        if link.created {
            println!("  Token sent to: {}", link.subscriber.email);
        }
    }
}

fn run_filters(token: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    let filters = ok_or_exit(
        block_on_or_exit(service.filters_by_token(&token)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "subscriber.filters",
            "count": filters.len(),
            "filters": filters,
        }));
        return;
    }

    println!("shapewatch subscriber filters");
    println!("  Count: {}", filters.len());
    for filter in filters {
        let combinator = if filter.require_all { "ALL" } else { "ANY" };
        let children: Vec<&str> = filter
            .constraints
            .iter()
            .chain(&filter.sub_filters)
            .map(String::as_str)
            .collect();
        println!("  - {} [{combinator}] {}", filter.id, children.join(", "));
    }
}

fn run_unsubscribe(token: String, filter: String, config: &Config, json_output: bool) {
    let service = service_or_exit(config);
    ok_or_exit(
        block_on_or_exit(service.unsubscribe(&token, &filter)),
        json_output,
    );

    if json_output {
        print_json(&json!({
            "action": "subscriber.unsubscribe",
            "filter": filter,
        }));
    } else {
        println!("shapewatch subscriber unsubscribe");
        println!("  Unsubscribed: {filter}");
    }
}
