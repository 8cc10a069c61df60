//! Schema command - print the expected ledger format

use clap::Args;
use schemars::schema_for;
use splitc::ledger::LedgerInput;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema or example
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the ledger file
    JsonSchema,
    /// A small ledger covering every split policy
    Example,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(LedgerInput);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::Example => {
                // reparse so the printed example always matches the loader
                let input: LedgerInput = serde_json::from_str(EXAMPLE_LEDGER)?;
                println!("{}", serde_json::to_string_pretty(&input)?);
            }
        }
        Ok(())
    }
}

const EXAMPLE_LEDGER: &str = r#"{
  "name": "Lisbon trip",
  "members": ["alice", "bob", "carol"],
  "expenses": [
    {
      "id": "e1",
      "paid_by": "alice",
      "description": "Dinner",
      "category": "Food",
      "date": "2024-05-01",
      "amount": 90.00,
      "split": { "policy": "equal", "participants": ["alice", "bob", "carol"] }
    },
    {
      "id": "e2",
      "paid_by": "bob",
      "description": "Museum tickets",
      "category": "Activities",
      "date": "2024-05-02",
      "amount": 45.00,
      "split": { "policy": "exact", "amounts": { "alice": 15.00, "bob": 15.00, "carol": 15.00 } }
    },
    {
      "id": "e3",
      "paid_by": "carol",
      "description": "Apartment",
      "category": "Lodging",
      "date": "2024-05-01",
      "amount": 300.00,
      "split": { "policy": "percentage", "percentages": { "alice": 40, "bob": 30, "carol": 30 } }
    },
    {
      "id": "e4",
      "paid_by": "alice",
      "description": "Taxi",
      "category": "Transport",
      "date": "2024-05-03",
      "amount": 24.00,
      "split": { "policy": "shares", "weights": { "alice": 2, "bob": 1, "carol": 1 } }
    }
  ],
  "settlements": [
    {
      "id": "s1",
      "paid_by": "bob",
      "paid_to": "alice",
      "amount": 20.00,
      "settled_at": "2024-05-04T18:30:00+01:00"
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use splitc::ledger::read_ledger_json;

    #[test]
    fn example_ledger_loads() {
        let group = read_ledger_json(EXAMPLE_LEDGER.as_bytes()).unwrap();
        assert_eq!(group.name, "Lisbon trip");
        assert_eq!(group.expenses().len(), 4);
        assert_eq!(group.settlements().len(), 1);
        assert!(group.warnings().is_empty());
    }
}
