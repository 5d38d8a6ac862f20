//! Cross-component integration tests.

pub mod encrypted_exchange;
pub mod session_lifecycle;

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{generic_array::GenericArray, Aead, KeyInit};
use aes_gcm::aes::Aes128;
use aes_gcm::AesGcm;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flow_crypto::{flip_iv, CryptoChannel};
use flow_gateway::{
    CompletionSink, FlowGatewayService, GatewayConfig, InMemoryCompletionSink,
    InMemoryTokenMetadata,
};
use hmac::{Hmac, Mac};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

/// The platform sends a 128-bit AES key and a 16-byte IV.
type PlatformCipher = AesGcm<Aes128, U16>;

/// Plays the remote platform: wraps keys, seals requests, opens responses.
pub struct TestClient {
    router: Router,
    public_key: RsaPublicKey,
    aes_key: [u8; 16],
    next_iv: u8,
    secret: Option<String>,
    pub metadata: Arc<InMemoryTokenMetadata>,
    pub sink: Arc<InMemoryCompletionSink>,
}

impl TestClient {
    pub fn new(config: GatewayConfig) -> Self {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let secret = config.app_secret.clone();
        let metadata = Arc::new(InMemoryTokenMetadata::new());
        let sink = Arc::new(InMemoryCompletionSink::new());
        let service = FlowGatewayService::with_channel(
            config,
            CryptoChannel::from_key(private_key),
            Arc::clone(&metadata) as Arc<dyn flow_gateway::TokenMetadataStore>,
            Arc::clone(&sink) as Arc<dyn CompletionSink>,
        );

        Self {
            router: service.router(),
            public_key,
            aes_key: [0x42; 16],
            next_iv: 1,
            secret,
            metadata,
            sink,
        }
    }

    /// Encrypt an envelope into the wire payload, fresh IV per call.
    pub fn seal(&mut self, envelope: &Value) -> (String, [u8; 16]) {
        let mut iv = [0u8; 16];
        iv[0] = self.next_iv;
        self.next_iv += 1;

        let mut rng = rand::thread_rng();
        let wrapped = self
            .public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), &self.aes_key)
            .unwrap();
        let cipher = PlatformCipher::new_from_slice(&self.aes_key).unwrap();
        let sealed = cipher
            .encrypt(
                GenericArray::from_slice(&iv),
                serde_json::to_vec(envelope).unwrap().as_slice(),
            )
            .unwrap();

        let body = serde_json::json!({
            "encrypted_flow_data": BASE64.encode(sealed),
            "encrypted_aes_key": BASE64.encode(wrapped),
            "initial_vector": BASE64.encode(iv),
        });
        (body.to_string(), iv)
    }

    /// POST a raw body through the router, signing it when a secret is
    /// configured.
    pub async fn post(&self, body: String) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook/flows")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            // Qualified: KeyInit is also in scope and supplies its own
            // `new_from_slice`.
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).unwrap();
            mac.update(body.as_bytes());
            builder = builder.header(
                "x-hub-signature-256",
                format!("sha256={}", hex::encode(mac.finalize().into_bytes())),
            );
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    /// Send one encrypted exchange and open the response envelope with the
    /// flipped IV, asserting 200.
    pub async fn exchange(&mut self, envelope: Value) -> Value {
        let (body, iv) = self.seal(&envelope);
        let response = self.post(body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let sealed_b64 = read_body(response).await;
        let sealed = BASE64.decode(sealed_b64.trim()).unwrap();
        let cipher = PlatformCipher::new_from_slice(&self.aes_key).unwrap();
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(&flip_iv(&iv)), sealed.as_slice())
            .unwrap();
        serde_json::from_slice(&plaintext).unwrap()
    }
}

pub async fn read_body(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
