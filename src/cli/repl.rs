use crate::storage;
use crate::types::{Entity, QueryOptions, TraverseOptions, TypedValue};
use crate::TripleStore;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

pub struct Repl {
    store: TripleStore,
    editor: DefaultEditor,
}

impl Repl {
    /// Start a shell over a fresh store, optionally preloaded from an entity file
    pub fn new(load: Option<&Path>) -> anyhow::Result<Self> {
        let store = TripleStore::new();
        if let Some(path) = load {
            let report = storage::load_file(&store, path)?;
            println!(
                "Loaded {} entities from {} ({} failed)",
                report.inserted,
                path.display(),
                report.failures.len()
            );
        }

        let editor = DefaultEditor::new()?;

        Ok(Self { store, editor })
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        println!("TripleDB Interactive Shell");
        println!("Type 'help' for commands, 'exit' to quit\n");

        loop {
            let readline = self.editor.readline("tripledb> ");
            match readline {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    self.editor.add_history_entry(line)?;

                    if let Err(e) = self.execute_command(line) {
                        eprintln!("Error: {}", e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("exit");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn execute_command(&self, line: &str) -> anyhow::Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.is_empty() {
            return Ok(());
        }

        match parts[0] {
            "help" => self.show_help(),
            "exit" | "quit" => std::process::exit(0),
            "load" => self.load(&parts[1..])?,
            "insert" => self.insert(&parts[1..])?,
            "get" => self.get(&parts[1..])?,
            "update" => self.update(&parts[1..])?,
            "delete" => self.delete(&parts[1..])?,
            "triple" => self.insert_triple(&parts[1..])?,
            "untriple" => self.delete_triple(&parts[1..])?,
            "triples" => self.triples(&parts[1..])?,
            "predicate" => self.triples_by_predicate(&parts[1..])?,
            "traverse" => self.traverse(&parts[1..])?,
            "reverse" => self.reverse(&parts[1..])?,
            "path" => self.path(&parts[1..])?,
            "query" => self.query(&parts[1..])?,
            "count" => println!("{} entities", self.store.count()),
            "stats" => self.stats()?,
            "export" => {
                storage::write_triples(&self.store, std::io::stdout().lock())?;
            }
            "clear" => {
                self.store.close();
                println!("Store cleared");
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", parts[0]);
            }
        }

        Ok(())
    }

    fn show_help(&self) {
        println!("Available commands:");
        println!();
        println!("  === Entities ===");
        println!("  load <file>                           - Load a JSON/NDJSON entity file");
        println!("  insert <json>                         - Insert an entity");
        println!("  get <id>                              - Show an entity");
        println!("  update <id> <json>                    - Overwrite entity properties");
        println!("  delete <id>                           - Delete an entity");
        println!();
        println!("  === Triples ===");
        println!("  triple <subject> <predicate> <value>  - Insert a typed triple");
        println!("  untriple <subject> <predicate>        - Delete a triple");
        println!("  triples <subject>                     - List triples of a subject");
        println!("  predicate <predicate> [limit]         - List triples carrying a predicate");
        println!();
        println!("  === Graph ===");
        println!("  traverse <start> <predicate> [depth] [limit]");
        println!("  reverse <target> <predicate> [limit]");
        println!("  path <start> <p1,p2,...> [limit]");
        println!();
        println!("  === Store ===");
        println!("  query <query> [limit] [skip]          - type:<Name>, <predicate>:<value> or *");
        println!("  count                                 - Count entities");
        println!("  stats                                 - Show triple/entity/predicate counts");
        println!("  export                                - Print all triples as NDJSON");
        println!("  clear                                 - Remove everything");
        println!("  exit/quit                             - Exit the shell");
        println!();
        println!("Examples:");
        println!("  insert {{\"$id\":\"user:1\",\"$type\":\"User\",\"follows\":\"user:2\"}}");
        println!("  triple user:2 follows {{\"type\":\"REF\",\"value\":\"user:3\"}}");
        println!("  traverse user:1 follows 2");
        println!("  query type:User 10");
    }

    fn load(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: load <file>");
            return Ok(());
        }

        let report = storage::load_file(&self.store, args[0])?;
        println!("Loaded {} entities", report.inserted);
        for failure in report.failures {
            println!("  record {}: {}", failure.record, failure.error);
        }

        Ok(())
    }

    fn insert(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: insert <json>");
            return Ok(());
        }

        let json_str = args.join(" ");
        let data: serde_json::Value = serde_json::from_str(&json_str)?;

        let id = self.store.insert(data)?;
        println!("Inserted entity with ID: {}", id);

        Ok(())
    }

    fn get(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: get <id>");
            return Ok(());
        }

        match self.store.get(args[0]) {
            Some(entity) => println!("{}", serde_json::to_string_pretty(&entity)?),
            None => println!("Entity not found: {}", args[0]),
        }

        Ok(())
    }

    fn update(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 2 {
            println!("Usage: update <id> <json>");
            return Ok(());
        }

        let id = args[0];
        let json_str = args[1..].join(" ");
        let data: serde_json::Value = serde_json::from_str(&json_str)?;

        self.store.update(id, data)?;
        println!("Updated entity {}", id);

        Ok(())
    }

    fn delete(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: delete <id>");
            return Ok(());
        }

        if self.store.delete(args[0]) {
            println!("Deleted entity {}", args[0]);
        } else {
            println!("Entity not found: {}", args[0]);
        }

        Ok(())
    }

    fn insert_triple(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 3 {
            println!("Usage: triple <subject> <predicate> <typed-json>");
            return Ok(());
        }

        let json_str = args[2..].join(" ");
        let value: TypedValue = serde_json::from_str(&json_str)?;

        self.store.insert_triple(args[0], args[1], value);
        println!("Stored ({}, {})", args[0], args[1]);

        Ok(())
    }

    fn delete_triple(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 2 {
            println!("Usage: untriple <subject> <predicate>");
            return Ok(());
        }

        if self.store.delete_triple(args[0], args[1]) {
            println!("Deleted ({}, {})", args[0], args[1]);
        } else {
            println!("No such triple");
        }

        Ok(())
    }

    fn triples(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: triples <subject>");
            return Ok(());
        }

        for triple in self.store.get_triples(args[0]) {
            println!("{}", serde_json::to_string(&triple)?);
        }

        Ok(())
    }

    fn triples_by_predicate(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: predicate <predicate> [limit]");
            return Ok(());
        }

        let limit = parse_optional(args.get(1))?;
        for triple in self.store.get_triples_by_predicate(args[0], limit) {
            println!("{}", serde_json::to_string(&triple)?);
        }

        Ok(())
    }

    fn traverse(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 2 {
            println!("Usage: traverse <start> <predicate> [depth] [limit]");
            return Ok(());
        }

        let options = TraverseOptions {
            max_depth: parse_optional(args.get(2))?,
            limit: parse_optional(args.get(3))?,
        };
        print_entities(&self.store.traverse(args[0], args[1], options))
    }

    fn reverse(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 2 {
            println!("Usage: reverse <target> <predicate> [limit]");
            return Ok(());
        }

        let limit = parse_optional(args.get(2))?;
        print_entities(&self.store.reverse_traverse(args[0], args[1], limit))
    }

    fn path(&self, args: &[&str]) -> anyhow::Result<()> {
        if args.len() < 2 {
            println!("Usage: path <start> <p1,p2,...> [limit]");
            return Ok(());
        }

        let path: Vec<&str> = args[1].split(',').filter(|p| !p.is_empty()).collect();
        let limit = parse_optional(args.get(2))?;
        print_entities(&self.store.path_traverse(args[0], path.as_slice(), limit))
    }

    fn query(&self, args: &[&str]) -> anyhow::Result<()> {
        let query = args.first().copied().unwrap_or("*");
        let options = QueryOptions {
            limit: parse_optional(args.get(1))?,
            skip: parse_optional(args.get(2))?.unwrap_or(0),
        };

        let result = self.store.query_with(query, options)?;
        print_entities(&result.entities)?;
        println!(
            "scanned {} subjects / {} triples in {:.3} ms{}",
            result.stats.subjects_scanned,
            result.stats.triples_scanned,
            result.stats.duration_ms,
            if result.has_more { " (more available)" } else { "" }
        );

        Ok(())
    }

    fn stats(&self) -> anyhow::Result<()> {
        let stats = self.store.stats();
        println!("Triples:    {}", stats.triples);
        println!("Entities:   {}", stats.entities);
        println!("Predicates: {}", stats.predicates);
        Ok(())
    }
}

fn parse_optional(arg: Option<&&str>) -> anyhow::Result<Option<usize>> {
    arg.map(|s| {
        s.parse::<usize>()
            .map_err(|_| anyhow::anyhow!("Invalid number: {}", s))
    })
    .transpose()
}

pub fn print_entities(entities: &[Entity]) -> anyhow::Result<()> {
    if entities.is_empty() {
        println!("No entities found");
        return Ok(());
    }

    println!("Found {} entit{}:", entities.len(), if entities.len() == 1 { "y" } else { "ies" });
    for entity in entities {
        println!("{}", serde_json::to_string(entity)?);
    }

    Ok(())
}
