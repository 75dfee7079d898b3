use thiserror::Error;

/// Errores del núcleo. Cada variante sabe producir el mensaje que se
/// muestra al usuario vía toast; nunca se propaga un error sin clasificar
/// hacia la capa de presentación.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No encontrado")]
    NoEncontrado,

    #[error("Validación: {0}")]
    Validacion(String),

    #[error("Registro duplicado: {0}")]
    Duplicado(String),

    #[error("Referencia inválida: {0}")]
    ReferenciaInvalida(String),

    #[error("Permiso denegado")]
    PermisoDenegado,

    #[error("Tiempo de espera agotado en {0}")]
    Timeout(&'static str),

    #[error("Error de base de datos")]
    Db(#[from] sqlx::Error),

    #[error("Error interno")]
    Interno(#[from] anyhow::Error),
}

impl AppError {
    /// Mensaje en español apto para mostrarse en un toast.
    pub fn mensaje_usuario(&self) -> String {
        match self {
            AppError::NoEncontrado => "No se encontró el registro solicitado".to_string(),
            AppError::Validacion(msg) => msg.clone(),
            AppError::Duplicado(_) => "Ya existe un registro con esos datos".to_string(),
            AppError::ReferenciaInvalida(_) => {
                "Uno o más productos referenciados no existen".to_string()
            }
            AppError::PermisoDenegado => "No tienes permiso para realizar esta acción".to_string(),
            AppError::Timeout(_) => {
                "La conexión está demasiado lenta, intenta nuevamente".to_string()
            }
            AppError::Db(_) | AppError::Interno(_) => {
                "Ocurrió un error inesperado, intenta nuevamente".to_string()
            }
        }
    }
}

/// Clasifica un error de sqlx por su SQLSTATE en la taxonomía de la app.
///
/// `23505` violación de unicidad, `23503` violación de clave foránea,
/// `42501` denegación por row-level security (equivalente directo del
/// `PGRST301` que entrega PostgREST).
pub fn clasificar_error_db(err: sqlx::Error) -> AppError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return AppError::NoEncontrado;
    }
    let codigo = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.to_string());
    match codigo.as_deref() {
        Some("23505") => AppError::Duplicado(err.to_string()),
        Some("23503") => AppError::ReferenciaInvalida(err.to_string()),
        Some("42501") => AppError::PermisoDenegado,
        _ => AppError::Db(err),
    }
}

pub type AppResult<T> = Result<T, AppError>;
