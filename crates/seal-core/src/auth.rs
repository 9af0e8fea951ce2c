//! Contexto de petición con identidad ya verificada.
//!
//! La verificación de identidad es responsabilidad de un colaborador
//! externo; el Signer sólo confía en la bandera que llega aquí. No hay
//! autorización por registro (ambigüedad documentada en DESIGN.md).

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    caller: Option<String>,
}

impl RequestContext {
    /// Petición de un caller ya autenticado por el colaborador de identidad.
    pub fn authenticated(caller: impl Into<String>) -> Self {
        RequestContext { request_id: Uuid::new_v4(),
                         caller: Some(caller.into()) }
    }

    /// Petición sin identidad verificada (será rechazada por el Signer).
    pub fn anonymous() -> Self {
        RequestContext { request_id: Uuid::new_v4(),
                         caller: None }
    }

    pub fn is_authenticated(&self) -> bool { self.caller.is_some() }
    pub fn caller(&self) -> Option<&str> { self.caller.as_deref() }

    /// Id de correlación para logs; no participa en el hash ni en la cadena.
    pub fn request_id(&self) -> Uuid { self.request_id }
}
