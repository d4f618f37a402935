//! FTP transport: the session traits the delivery client talks to, and their
//! suppaftp implementation for plain FTP and explicit FTPS.

use std::{
    io::Cursor,
    net::{SocketAddr, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use rustls::{ClientConfig, RootCertStore};
use suppaftp::{
    types::FileType, FtpError, FtpStream, RustlsConnector, RustlsFtpStream, Status,
};
use thiserror::Error;

use super::FtpCredentials;

/// Error raised by a transport operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<FtpError> for TransportError {
    fn from(e: FtpError) -> Self {
        Self(e.to_string())
    }
}

/// An open control connection to an FTP server
#[cfg_attr(test, mockall::automock)]
pub trait FtpSession {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError>;

    fn cwd(&mut self, path: &str) -> Result<(), TransportError>;

    fn pwd(&mut self) -> Result<String, TransportError>;

    fn list_names(&mut self) -> Result<Vec<String>, TransportError>;

    /// Whether a file of that name exists in the working directory
    fn exists(&mut self, filename: &str) -> Result<bool, TransportError>;

    /// Store `data` as a binary file, returning the number of bytes sent
    fn put(&mut self, filename: &str, data: &[u8]) -> Result<u64, TransportError>;

    fn quit(&mut self) -> Result<(), TransportError>;
}

/// Opens sessions; one call per delivery attempt
#[cfg_attr(test, mockall::automock)]
pub trait FtpConnector: Send + Sync {
    fn connect(&self, credentials: &FtpCredentials) -> Result<Box<dyn FtpSession>, TransportError>;
}

/// Connector backed by suppaftp, passive mode, rustls for FTPS
#[derive(Debug, Clone)]
pub struct SuppaFtpConnector {
    timeout: Duration,
}

impl SuppaFtpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl FtpConnector for SuppaFtpConnector {
    fn connect(&self, credentials: &FtpCredentials) -> Result<Box<dyn FtpSession>, TransportError> {
        let addr = resolve(credentials)?;

        let session = if credentials.use_tls {
            tracing::info!("Using FTPS connection to {}", addr);
            let stream = RustlsFtpStream::connect_timeout(addr, self.timeout)?;
            let stream = stream.into_secure(RustlsConnector::from(tls_config()?), &credentials.hostname)?;
            SuppaFtpSession::Secure(stream)
        } else {
            tracing::info!("Using plain FTP connection to {}", addr);
            SuppaFtpSession::Plain(FtpStream::connect_timeout(addr, self.timeout)?)
        };

        Ok(Box::new(session))
    }
}

fn resolve(credentials: &FtpCredentials) -> Result<SocketAddr, TransportError> {
    (credentials.hostname.as_str(), credentials.port)
        .to_socket_addrs()
        .map_err(|e| TransportError(format!("Cannot resolve {}: {}", credentials.hostname, e)))?
        .next()
        .ok_or_else(|| TransportError(format!("No address found for {}", credentials.hostname)))
}

fn tls_config() -> Result<Arc<ClientConfig>, TransportError> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError(format!("TLS setup failed: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

enum SuppaFtpSession {
    Plain(FtpStream),
    Secure(RustlsFtpStream),
}

// Both stream flavours expose the same inherent API
macro_rules! on_stream {
    ($session:expr, $stream:ident => $body:expr) => {
        match $session {
            SuppaFtpSession::Plain($stream) => $body,
            SuppaFtpSession::Secure($stream) => $body,
        }
    };
}

impl FtpSession for SuppaFtpSession {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        on_stream!(self, s => s.login(username, password))?;
        Ok(())
    }

    fn cwd(&mut self, path: &str) -> Result<(), TransportError> {
        on_stream!(self, s => s.cwd(path))?;
        Ok(())
    }

    fn pwd(&mut self) -> Result<String, TransportError> {
        Ok(on_stream!(self, s => s.pwd())?)
    }

    fn list_names(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(on_stream!(self, s => s.nlst(None))?)
    }

    fn exists(&mut self, filename: &str) -> Result<bool, TransportError> {
        // Servers refuse SIZE in ASCII mode with the same 550 as a missing file
        on_stream!(self, s => s.transfer_type(FileType::Binary))?;
        match on_stream!(self, s => s.size(filename)) {
            Ok(_) => Ok(true),
            Err(FtpError::UnexpectedResponse(response))
                if response.status == Status::FileUnavailable =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, filename: &str, data: &[u8]) -> Result<u64, TransportError> {
        on_stream!(self, s => s.transfer_type(FileType::Binary))?;
        let mut reader = Cursor::new(data);
        Ok(on_stream!(self, s => s.put_file(filename, &mut reader))?)
    }

    fn quit(&mut self) -> Result<(), TransportError> {
        on_stream!(self, s => s.quit())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    use crate::{config::FtpSettings, error::ExportError, services::ftp::DeliveryClient};

    /// Minimal control-channel server: greets, answers each command from
    /// `replies` by verb and returns the commands it received
    fn scripted_server(replies: Vec<(&'static str, &'static str)>) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            writer.write_all(b"220 ready\r\n").unwrap();

            let mut received = Vec::new();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap_or(0) > 0 {
                let command = line.trim_end().to_string();
                line.clear();
                let verb = command.split(' ').next().unwrap_or_default().to_string();
                received.push(command);

                if verb == "QUIT" {
                    let _ = writer.write_all(b"221 bye\r\n");
                    break;
                }
                let reply = replies
                    .iter()
                    .find(|(v, _)| *v == verb)
                    .map(|(_, reply)| *reply)
                    .unwrap_or("502 not implemented");
                writer.write_all(format!("{}\r\n", reply).as_bytes()).unwrap();
            }
            received
        });

        (port, handle)
    }

    fn credentials(port: u16) -> FtpCredentials {
        FtpCredentials {
            hostname: "127.0.0.1".into(),
            port,
            username: "exporter".into(),
            password: "secret".into(),
            remote_dir: "/".into(),
            use_tls: false,
        }
    }

    fn connect(port: u16) -> Box<dyn FtpSession> {
        let connector = SuppaFtpConnector::new(Duration::from_secs(5));
        let mut session = connector.connect(&credentials(port)).unwrap();
        session.login("exporter", "secret").unwrap();
        session
    }

    /// Replies for a successful login plus `size_reply` to SIZE
    fn replies(size_reply: &'static str) -> Vec<(&'static str, &'static str)> {
        vec![
            ("USER", "331 password required"),
            ("PASS", "230 logged in"),
            ("TYPE", "200 type set"),
            ("SIZE", size_reply),
        ]
    }

    #[test]
    fn test_exists_switches_to_binary_before_size() {
        let (port, server) = scripted_server(replies("213 42"));

        let mut session = connect(port);
        assert_eq!(session.exists("a.csv"), Ok(true));
        session.quit().unwrap();

        let received = server.join().unwrap();
        let type_at = received.iter().position(|c| c == "TYPE I").unwrap();
        let size_at = received.iter().position(|c| c == "SIZE a.csv").unwrap();
        assert!(type_at < size_at, "{:?}", received);
    }

    #[test]
    fn test_exists_missing_file() {
        let (port, server) = scripted_server(replies("550 Could not get file size."));

        let mut session = connect(port);
        assert_eq!(session.exists("a.csv"), Ok(false));
        session.quit().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn test_exists_unsupported_size_is_error() {
        let (port, server) = scripted_server(replies("502 Command not implemented"));

        let mut session = connect(port);
        assert!(session.exists("a.csv").is_err());
        session.quit().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn test_closed_port_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = DeliveryClient::new(
            Arc::new(SuppaFtpConnector::new(Duration::from_secs(5))),
            true,
        );
        let settings = FtpSettings {
            hostname: Some("127.0.0.1".into()),
            port: Some(port.to_string()),
            username: Some("exporter".into()),
            password: Some("secret".into()),
            ..Default::default()
        };

        let err = client.deliver(b"x", "a.csv", &settings).unwrap_err();
        assert!(matches!(err, ExportError::Connection(_)), "{:?}", err);
    }
}
