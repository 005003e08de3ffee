//! Basic example of a Sijill injector chain.

use std::sync::Arc;

use sijill::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
    debug: bool,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

impl Injectable for Database {
    fn construct(deps: &Deps<'_>) -> Result<Self, BoxError> {
        let config = deps.get::<Config>(0)?;
        let logger = deps.get::<Arc<dyn Logger>>(1)?;
        Ok(Database {
            url: config.database_url.clone(),
            logger: Arc::clone(&logger),
        })
    }
}

struct UserService {
    db: Arc<Database>,
    audit: Option<Arc<String>>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        if let Some(audit) = &self.audit {
            println!("[AUDIT {audit}] get_user({id})");
        }
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

impl Injectable for UserService {
    fn construct(deps: &Deps<'_>) -> Result<Self, BoxError> {
        Ok(UserService {
            db: deps.get::<Database>(0)?,
            audit: deps.optional::<String>(1)?,
        })
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("sijill_injector=debug")
        .init();

    let logger = OpaqueToken::new("LOGGER");
    let audit = OpaqueToken::new("AUDIT_TAG");
    let plugins = OpaqueToken::new("PLUGINS");

    // Application-wide scope
    let root = StaticInjector::builder()
        .name("root")
        .provider(Provider::new(Token::of::<Config>()).use_value(Config {
            database_url: "postgres://localhost/myapp".to_string(),
            debug: true,
        }))
        .provider(
            Provider::new(&logger)
                .use_factory(|_| Ok(instance(Arc::new(ConsoleLogger) as Arc<dyn Logger>)))
                .deps(Vec::<Dep>::new()),
        )
        .provider(Provider::of::<Database>().deps([Token::of::<Config>(), logger.clone().into()]))
        .provider(Provider::new(&plugins).use_value("auth").multi())
        .provider(Provider::new(&plugins).use_value("metrics").multi())
        .build()?;

    // Request scope: adds an audit tag and the service that reads it
    let request = StaticInjector::builder()
        .name("request")
        .parent(root.clone())
        .provider(Provider::new(&audit).use_value(String::from("req-42")))
        .provider(
            Provider::of::<UserService>()
                .deps([Dep::from(Token::of::<Database>()), Dep::optional(&audit)]),
        )
        .build()?;

    println!("{root}");
    println!("{request}");

    let config = root.get::<Config>(Token::of::<Config>())?;
    println!("Debug mode: {}", config.debug);

    let service = request.get::<UserService>(Token::of::<UserService>())?;
    println!("{}", service.get_user(1));

    // Memoized: same instance every time
    let again = request.get::<UserService>(Token::of::<UserService>())?;
    println!("Same service: {}", Arc::ptr_eq(&service, &again));

    let names: Vec<&str> = root
        .get_all::<&'static str>(&plugins)?
        .iter()
        .map(|name| **name)
        .collect();
    println!("Plugins: {names:?}");

    // Errors carry the full token path
    match root.get_instance(Token::of::<UserService>()) {
        Ok(_) => println!("Unexpected: root has no UserService"),
        Err(e) => println!("Expected error: {e}"),
    }

    println!("{}", render_snapshot(&request));

    Ok(())
}

fn render_snapshot(injector: &StaticInjector) -> String {
    let snapshot = injector.snapshot();
    let lines: Vec<String> = snapshot
        .records
        .iter()
        .map(|record| format!("  {} ({:?}, {:?})", record.token, record.kind, record.state))
        .collect();
    format!("Snapshot of {:?}:\n{}", snapshot.name, lines.join("\n"))
}
