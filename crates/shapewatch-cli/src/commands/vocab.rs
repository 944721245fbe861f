use crate::support::print_json;
use serde_json::{Value, json};
use shapewatch_vocab::{Field, FragmentValue, Operator};

const SAMPLE_VALUE: &str = "value";

pub fn run(json_output: bool) {
    let fields: Vec<Value> = Field::ALL
        .iter()
        .map(|field| {
            let path = field.path();
            json!({
                "name": field.as_str(),
                "path": path.steps(),
                "sequence": path.is_sequence(),
            })
        })
        .collect();
    let operators: Vec<Value> = Operator::ALL
        .iter()
        .map(|op| {
            json!({
                "name": op.as_str(),
                "example": describe_fragment(*op),
            })
        })
        .collect();

    if json_output {
        print_json(&json!({
            "action": "vocab",
            "fields": fields,
            "operators": operators,
        }));
        return;
    }

    println!("shapewatch vocab");
    println!("  Fields:");
    for field in Field::ALL {
        println!("    {:<12} {}", field.as_str(), field.path().steps().join(" / "));
    }
    println!("  Operators (object = \"{SAMPLE_VALUE}\"):");
    for op in Operator::ALL {
        println!("    {:<15} {}", op.as_str(), describe_fragment(op));
    }
}

fn describe_fragment(op: Operator) -> String {
    op.fragment(SAMPLE_VALUE)
        .facts()
        .iter()
        .map(|fact| match &fact.value {
            FragmentValue::Text(text) => format!("{} \"{text}\"", short(fact.predicate)),
            FragmentValue::Integer(n) => format!("{} {n}", short(fact.predicate)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn short(iri: &str) -> String {
    match iri.rsplit_once('#') {
        Some((_, local)) => format!("sh:{local}"),
        None => iri.to_string(),
    }
}
