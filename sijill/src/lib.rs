//! # Sijill: a static, hierarchical injector for Rust
//!
//! Declare how each token is produced, build an injector once, and
//! resolve tokens lazily. Values are memoized per injector; tokens not
//! provided locally are looked up in the parent chain.
//!
//! ```rust
//! use sijill::prelude::*;
//!
//! let injector = StaticInjector::builder()
//!     .provider(Provider::new("port").use_value(8080u16))
//!     .provider(
//!         Provider::new("addr")
//!             .use_factory(|deps| Ok(instance(format!("0.0.0.0:{}", deps.get::<u16>(0)?))))
//!             .deps(["port"]),
//!     )
//!     .build()
//!     .expect("Failed to build injector");
//!
//! assert_eq!(injector.get::<String>("addr").unwrap().as_str(), "0.0.0.0:8080");
//! ```

pub use sijill_injector::*;
pub use sijill_support as support;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    trait Logger: Send + Sync {
        fn prefix(&self) -> &str;
    }

    struct ConsoleLogger;

    impl Logger for ConsoleLogger {
        fn prefix(&self) -> &str {
            "console"
        }
    }

    struct Database {
        url: Arc<String>,
    }

    impl Injectable for Database {
        fn construct(deps: &Deps<'_>) -> Result<Self, BoxError> {
            Ok(Database { url: deps.get::<String>(0)? })
        }
    }

    struct UserService {
        db: Arc<Database>,
        logger: Arc<Arc<dyn Logger>>,
    }

    impl Injectable for UserService {
        fn construct(deps: &Deps<'_>) -> Result<Self, BoxError> {
            Ok(UserService {
                db: deps.get::<Database>(0)?,
                logger: deps.get::<Arc<dyn Logger>>(1)?,
            })
        }
    }

    fn app_providers(url: OpaqueToken, logger: OpaqueToken) -> Vec<ProviderEntry> {
        vec![
            Provider::new(&url).use_value(String::from("postgres://localhost/app")).into(),
            Provider::new(&logger)
                .use_factory(|_| Ok(instance(Arc::new(ConsoleLogger) as Arc<dyn Logger>)))
                .deps(Vec::<Dep>::new())
                .into(),
            vec![
                Provider::of::<Database>().deps([&url]),
                Provider::of::<UserService>().deps([Token::of::<Database>(), logger.into()]),
            ]
            .into(),
        ]
    }

    #[test]
    fn resolves_a_service_graph() {
        let url = OpaqueToken::new("DATABASE_URL");
        let logger = OpaqueToken::new("LOGGER");
        let injector = StaticInjector::builder()
            .name("app")
            .providers(app_providers(url, logger))
            .build()
            .unwrap();

        let service = injector.get::<UserService>(Token::of::<UserService>()).unwrap();
        assert_eq!(service.db.url.as_str(), "postgres://localhost/app");
        assert_eq!(service.logger.prefix(), "console");

        let db = injector.get::<Database>(Token::of::<Database>()).unwrap();
        assert!(Arc::ptr_eq(&db, &service.db));
    }

    #[test]
    fn request_scope_overrides_and_inherits() {
        let url = OpaqueToken::new("DATABASE_URL");
        let logger = OpaqueToken::new("LOGGER");
        let root = StaticInjector::create(app_providers(url.clone(), logger), None).unwrap();

        let request = root
            .create_child([
                Provider::new(&url).use_value(String::from("postgres://replica/app")),
                Provider::of::<Database>().deps([&url]),
            ])
            .unwrap();

        let root_db = root.get::<Database>(Token::of::<Database>()).unwrap();
        let request_db = request.get::<Database>(Token::of::<Database>()).unwrap();
        assert_eq!(root_db.url.as_str(), "postgres://localhost/app");
        assert_eq!(request_db.url.as_str(), "postgres://replica/app");

        // UserService is only registered at the root, so it sees the root database
        let service = request.get::<UserService>(Token::of::<UserService>()).unwrap();
        assert!(Arc::ptr_eq(&service.db, &root_db));
    }

    #[test]
    fn missing_dependency_names_the_whole_path() {
        let logger = OpaqueToken::new("LOGGER");
        let injector = StaticInjector::builder()
            .name("app")
            .provider(Provider::of::<Database>().deps([OpaqueToken::new("DATABASE_URL")]))
            .provider(Provider::of::<UserService>().deps([Token::of::<Database>(), logger.into()]))
            .build()
            .unwrap();

        let err = injector.get_instance(Token::of::<UserService>()).unwrap_err();
        assert!(matches!(err, InjectorError::NoProvider(_)));
        assert_eq!(
            err.to_string(),
            "StaticInjectorError(app)[UserService -> Database -> InjectionToken DATABASE_URL]: \
             NullInjectorError: No provider for InjectionToken DATABASE_URL! Did you mean: Database?"
        );
    }

    #[test]
    fn plugins_collect_through_the_chain() {
        let plugins = OpaqueToken::new("PLUGINS");
        let root = StaticInjector::create(
            [
                Provider::new(&plugins).use_value("auth").multi(),
                Provider::new(&plugins).use_value("metrics").multi(),
            ],
            None,
        )
        .unwrap();
        let child = root
            .create_child([Provider::new("enabled")
                .use_factory(|deps| {
                    let all = deps.get::<Vec<Instance>>(0)?;
                    Ok(instance(all.len()))
                })
                .deps([Dep::skip_self(&plugins)])])
            .unwrap();

        let names: Vec<&str> = root
            .get_all::<&'static str>(&plugins)
            .unwrap()
            .iter()
            .map(|name| **name)
            .collect();
        assert_eq!(names, vec!["auth", "metrics"]);
        assert_eq!(*child.get::<usize>("enabled").unwrap(), 2);
    }
}
