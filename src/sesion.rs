use std::sync::RwLock;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult, clasificar_error_db},
    models::{Perfil, PerfilRow},
    toast::ToastBus,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub rol: String,
    pub exp: usize,
}

#[derive(Debug, Deserialize)]
pub struct DatosRegistro {
    pub email: String,
    pub password: String,
    pub nombres: String,
    pub apellidos: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActualizacionPerfil {
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
    pub telefono: Option<String>,
    pub ciudad: Option<String>,
    pub avatar_url: Option<String>,
    pub descripcion_vendedor: Option<String>,
    pub qr_pago_url: Option<String>,
}

/// Proveedor de sesión autenticada. Es el dueño exclusivo del perfil
/// vigente; el resto del núcleo solo lee instantáneas vía
/// [`Sesion::perfil_actual`] y jamás lo muta.
pub struct Sesion {
    pool: DbPool,
    toasts: ToastBus,
    jwt_secret: String,
    actual: RwLock<Option<Perfil>>,
}

impl Sesion {
    pub fn new(pool: DbPool, toasts: ToastBus, jwt_secret: String) -> Self {
        Self {
            pool,
            toasts,
            jwt_secret,
            actual: RwLock::new(None),
        }
    }

    pub fn perfil_actual(&self) -> Option<Perfil> {
        self.actual.read().unwrap().clone()
    }

    pub async fn registrar(&self, datos: DatosRegistro) -> AppResult<Perfil> {
        let existe: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM perfiles WHERE email = $1")
            .bind(datos.email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(clasificar_error_db)?;
        if existe.is_some() {
            let err = AppError::Validacion("El correo ya está registrado".to_string());
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(datos.password.as_bytes(), &salt)
            .map_err(|e| AppError::Interno(anyhow::anyhow!(e.to_string())))?
            .to_string();

        let row: PerfilRow = sqlx::query_as(
            r#"
            INSERT INTO perfiles (id, email, password_hash, nombres, apellidos, rol)
            VALUES ($1, $2, $3, $4, $5, 'usuario')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(datos.email.as_str())
        .bind(password_hash)
        .bind(datos.nombres.as_str())
        .bind(datos.apellidos.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(clasificar_error_db)?;

        let perfil = Perfil::from(row);
        self.toasts.exito("Cuenta creada, bienvenido");
        Ok(perfil)
    }

    /// Verifica credenciales, emite un token de 24 horas y deja el
    /// perfil como sesión vigente.
    pub async fn iniciar(&self, email: &str, password: &str) -> AppResult<(Perfil, String)> {
        let row: Option<PerfilRow> = sqlx::query_as("SELECT * FROM perfiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(clasificar_error_db)?;

        let credenciales_invalidas =
            || AppError::Validacion("Correo o contraseña incorrectos".to_string());

        let Some(row) = row else {
            let err = credenciales_invalidas();
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        };
        let perfil = Perfil::from(row);

        if !perfil.activo {
            let err = AppError::Validacion("La cuenta está desactivada".to_string());
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        let hash = PasswordHash::new(&perfil.password_hash)
            .map_err(|_| AppError::Interno(anyhow::anyhow!("hash de contraseña inválido")))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_err()
        {
            let err = credenciales_invalidas();
            self.toasts.error(err.mensaje_usuario());
            return Err(err);
        }

        let expiracion = Utc::now()
            .checked_add_signed(Duration::hours(24))
            .ok_or_else(|| AppError::Interno(anyhow::anyhow!("expiración fuera de rango")))?;
        let claims = Claims {
            sub: perfil.id.to_string(),
            rol: perfil.rol.as_str().to_string(),
            exp: expiracion.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Interno(anyhow::anyhow!(e.to_string())))?;

        *self.actual.write().unwrap() = Some(perfil.clone());
        tracing::info!(usuario = %perfil.id, "sesión iniciada");
        self.toasts
            .exito(format!("Hola de nuevo, {}", perfil.nombres));
        Ok((perfil, token))
    }

    /// Reconstruye la sesión desde un token persistido (el camino del
    /// refresh token al reabrir la pestaña).
    pub async fn restaurar(&self, token: &str) -> AppResult<Perfil> {
        let decodificado = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Validacion("Sesión expirada o inválida".to_string()))?;

        let id = Uuid::parse_str(&decodificado.claims.sub)
            .map_err(|_| AppError::Validacion("Token con identidad inválida".to_string()))?;

        let row: Option<PerfilRow> = sqlx::query_as("SELECT * FROM perfiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(clasificar_error_db)?;
        let perfil = Perfil::from(row.ok_or(AppError::NoEncontrado)?);

        *self.actual.write().unwrap() = Some(perfil.clone());
        Ok(perfil)
    }

    pub fn cerrar(&self) {
        *self.actual.write().unwrap() = None;
        self.toasts.info("Sesión cerrada");
    }

    /// Actualiza el perfil y refresca la instantánea vigente si
    /// corresponde a la misma identidad.
    pub async fn actualizar_perfil(
        &self,
        id: Uuid,
        cambios: ActualizacionPerfil,
    ) -> AppResult<Perfil> {
        let row: Option<PerfilRow> = sqlx::query_as(
            r#"
            UPDATE perfiles SET
                nombres = COALESCE($2, nombres),
                apellidos = COALESCE($3, apellidos),
                telefono = COALESCE($4, telefono),
                ciudad = COALESCE($5, ciudad),
                avatar_url = COALESCE($6, avatar_url),
                descripcion_vendedor = COALESCE($7, descripcion_vendedor),
                qr_pago_url = COALESCE($8, qr_pago_url),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(cambios.nombres)
        .bind(cambios.apellidos)
        .bind(cambios.telefono)
        .bind(cambios.ciudad)
        .bind(cambios.avatar_url)
        .bind(cambios.descripcion_vendedor)
        .bind(cambios.qr_pago_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(clasificar_error_db)?;

        let perfil = Perfil::from(row.ok_or(AppError::NoEncontrado)?);

        let mut actual = self.actual.write().unwrap();
        if actual.as_ref().is_some_and(|p| p.id == perfil.id) {
            *actual = Some(perfil.clone());
        }
        drop(actual);

        self.toasts.exito("Perfil actualizado");
        Ok(perfil)
    }
}
