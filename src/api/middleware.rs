//! # Utilidades de logging para errores

use std::error::Error as StdError;

/// Registra la cadena completa de errores (`source()` tras `source()`)
///
/// # Parámetros
/// - `error`: Error a analizar y registrar
/// - `context`: Contexto opcional para añadir información
pub fn log_error_chain<E>(error: &E, context: Option<&str>)
where
    E: StdError + 'static,
{
    let error_chain = error_chain(error);

    if let Some(ctx) = context {
        tracing::error!(
            context = %ctx,
            error_chain = ?error_chain,
            "Error with full chain (with context)"
        );
    } else {
        tracing::error!(error_chain = ?error_chain, "Error with full chain");
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current_error = Some(error);

    while let Some(err) = current_error {
        chain.push(err.to_string());
        current_error = err.source();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::orders::OrderError;

    #[test]
    fn chain_follows_sources() {
        let error = OrderError::from(StoreError::Internal("disco lleno".to_string()));
        let chain = error_chain(&error);
        assert_eq!(chain.len(), 2);
        assert!(chain[1].contains("disco lleno"));
    }
}
