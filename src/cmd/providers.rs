use vibra::{Config, OperationKind};

pub fn cmd_providers(config: &Config) {
    let registry = config.registry();

    for kind in [OperationKind::Search, OperationKind::Extract] {
        let providers = registry.providers_for(kind);
        println!("{kind} ({} providers):", providers.len());
        for (i, provider) in providers.iter().enumerate() {
            println!(
                "   {:>2}. {:<45} {:?} {}ms",
                i + 1,
                provider.base_address,
                provider.dialect,
                provider.per_attempt_timeout.as_millis()
            );
        }
        println!();
    }
}
