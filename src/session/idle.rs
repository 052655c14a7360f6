// src/session/idle.rs

use std::env;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Duration, Instant};

// ---
// Monitor de sessão ociosa (roda NO cliente: o shell do tablet/kiosk
// embute este crate). Três estados:
//
//   Active  -> interação recente observada
//   Warning -> limite de ociosidade estourou, contagem regressiva visível
//   Expired -> contagem esgotou (ou logout veio de outra sessão)
//
// A ociosidade é checada num intervalo grosso (barato); a contagem
// regressiva visível tem granularidade de 1 segundo. Captura de
// atividade, polling e contagem nunca se bloqueiam: é um único loop
// cooperativo com select.
// ---

#[derive(Debug, Clone, Copy)]
pub struct IdleConfig {
    pub idle_threshold: Duration,
    pub warning_duration: Duration,
    pub poll_interval: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(15 * 60),
            warning_duration: Duration::from_secs(60),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl IdleConfig {
    /// Defaults com overrides do ambiente (minutos/segundos).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(minutes) = env::var("IDLE_TIMEOUT_MINUTES") {
            if let Ok(minutes) = minutes.parse::<u64>() {
                config.idle_threshold = Duration::from_secs(minutes * 60);
            }
        }
        if let Ok(seconds) = env::var("IDLE_WARNING_SECONDS") {
            if let Ok(seconds) = seconds.parse::<u64>() {
                config.warning_duration = Duration::from_secs(seconds);
            }
        }

        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Warning,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// A contagem regressiva esgotou sem interação.
    IdleTimeout,
    /// Outra sessão do mesmo principal mandou encerrar (tablet compartilhado).
    RemoteLogout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    WarningStarted { remaining: Duration },
    CountdownTick { remaining: Duration },
    BackToActive,
    /// Quem embute o monitor invalida a credencial e redireciona
    /// para a reautenticação ao receber este evento.
    Expired(ExpiryReason),
}

// A alça que a captura de eventos de UI usa. Barata e sem await:
// pode ser chamada de qualquer callback.
#[derive(Clone)]
pub struct ActivityHandle {
    last_activity: Arc<Mutex<Instant>>,
}

impl ActivityHandle {
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }
}

pub struct IdleSessionMonitor {
    config: IdleConfig,
    last_activity: Arc<Mutex<Instant>>,
    events: mpsc::UnboundedSender<IdleEvent>,
    logout_rx: broadcast::Receiver<()>,
}

impl IdleSessionMonitor {
    /// Cria o monitor: devolve (monitor, alça de atividade, receptor de eventos).
    pub fn new(
        config: IdleConfig,
        logout_rx: broadcast::Receiver<()>,
    ) -> (Self, ActivityHandle, mpsc::UnboundedReceiver<IdleEvent>) {
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = ActivityHandle { last_activity: Arc::clone(&last_activity) };
        let monitor = Self {
            config,
            last_activity,
            events: events_tx,
            logout_rx,
        };

        (monitor, handle, events_rx)
    }

    fn last_activity(&self) -> Instant {
        self.last_activity
            .lock()
            .map(|last| *last)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    /// O loop do monitor. Roda até expirar; o chamador decide o que fazer
    /// com os eventos (mostrar contagem, invalidar credencial, redirecionar).
    pub async fn run(mut self) {
        let mut state = IdleState::Active;

        loop {
            match state {
                IdleState::Active => {
                    tokio::select! {
                        _ = time::sleep(self.config.poll_interval) => {
                            let idle_for = Instant::now() - self.last_activity();
                            if idle_for >= self.config.idle_threshold {
                                state = IdleState::Warning;
                                let _ = self.events.send(IdleEvent::WarningStarted {
                                    remaining: self.config.warning_duration,
                                });
                            }
                        }
                        _ = recv_logout(&mut self.logout_rx) => {
                            let _ = self.events.send(IdleEvent::Expired(ExpiryReason::RemoteLogout));
                            return;
                        }
                    }
                }

                IdleState::Warning => {
                    let warning_entered = Instant::now();
                    let deadline = warning_entered + self.config.warning_duration;

                    loop {
                        tokio::select! {
                            _ = time::sleep(Duration::from_secs(1)) => {
                                // Qualquer interação durante o aviso cancela a
                                // contagem e reinicia o relógio de ociosidade
                                if self.last_activity() > warning_entered {
                                    let _ = self.events.send(IdleEvent::BackToActive);
                                    state = IdleState::Active;
                                    break;
                                }

                                let now = Instant::now();
                                if now >= deadline {
                                    let _ = self.events.send(IdleEvent::Expired(ExpiryReason::IdleTimeout));
                                    return;
                                }

                                let _ = self.events.send(IdleEvent::CountdownTick {
                                    remaining: deadline - now,
                                });
                            }
                            _ = recv_logout(&mut self.logout_rx) => {
                                let _ = self.events.send(IdleEvent::Expired(ExpiryReason::RemoteLogout));
                                return;
                            }
                        }
                    }
                }

                // `run` retorna ao expirar; este braço nunca roda
                IdleState::Expired => return,
            }
        }
    }
}

// O sinal de logout de outra sessão derruba esta imediatamente, em
// qualquer estado. Canal fechado = ninguém mais transmite: o braço
// simplesmente nunca completa.
async fn recv_logout(rx: &mut broadcast::Receiver<()>) {
    loop {
        match rx.recv().await {
            Ok(()) => return,
            // Sinal perdido por lag ainda é sinal
            Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IdleConfig {
        IdleConfig::default()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<IdleEvent>) -> IdleEvent {
        rx.recv().await.expect("monitor ainda vivo")
    }

    // Avança consumindo ticks até sair algo diferente de CountdownTick
    async fn next_transition(rx: &mut mpsc::UnboundedReceiver<IdleEvent>) -> IdleEvent {
        loop {
            match next_event(rx).await {
                IdleEvent::CountdownTick { .. } => continue,
                other => return other,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expires_at_minute_sixteen_without_interaction() {
        let (_logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, _handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        let started = Instant::now();
        tokio::spawn(monitor.run());

        // Active -> Warning no minuto 15
        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));
        let warned_after = Instant::now() - started;
        assert!(warned_after >= Duration::from_secs(900));
        assert!(warned_after < Duration::from_secs(931));

        // Warning -> Expired no minuto 16
        let event = next_transition(&mut events).await;
        assert_eq!(event, IdleEvent::Expired(ExpiryReason::IdleTimeout));
        let expired_after = Instant::now() - started;
        assert!(expired_after >= Duration::from_secs(960));
        assert!(expired_after < Duration::from_secs(963));
    }

    #[tokio::test(start_paused = true)]
    async fn interaction_during_warning_restarts_the_clock() {
        let (_logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        let started = Instant::now();
        tokio::spawn(monitor.run());

        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));

        // Interação durante o aviso (uns segundos depois do aviso abrir):
        // cancela a contagem
        time::sleep(Duration::from_millis(1500)).await;
        handle.touch();
        let touched_at = Instant::now();

        let event = next_transition(&mut events).await;
        assert_eq!(event, IdleEvent::BackToActive);

        // O próximo aviso só vem depois de MAIS quinze minutos de ociosidade
        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));
        assert!(Instant::now() - touched_at >= Duration::from_secs(900));
        assert!(Instant::now() - started >= Duration::from_secs(900 + 900));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_while_active_postpones_the_warning() {
        let (_logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        let started = Instant::now();
        tokio::spawn(monitor.run());

        // Usuária interage aos ~10 minutos
        time::sleep(Duration::from_secs(600)).await;
        handle.touch();

        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));
        // 600s de uso + 900s de ociosidade, no mínimo
        assert!(Instant::now() - started >= Duration::from_secs(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_logout_expires_immediately_from_active() {
        let (logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, _handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        let started = Instant::now();
        tokio::spawn(monitor.run());

        logout_tx.send(()).expect("monitor inscrito");

        let event = next_event(&mut events).await;
        assert_eq!(event, IdleEvent::Expired(ExpiryReason::RemoteLogout));
        // Bem antes de qualquer limite de ociosidade
        assert!(Instant::now() - started < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_logout_expires_immediately_from_warning() {
        let (logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, _handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        tokio::spawn(monitor.run());

        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));

        logout_tx.send(()).expect("monitor inscrito");

        let event = next_transition(&mut events).await;
        assert_eq!(event, IdleEvent::Expired(ExpiryReason::RemoteLogout));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_have_one_second_granularity() {
        let (_logout_tx, logout_rx) = broadcast::channel(4);
        let (monitor, _handle, mut events) = IdleSessionMonitor::new(test_config(), logout_rx);
        tokio::spawn(monitor.run());

        let event = next_event(&mut events).await;
        assert!(matches!(event, IdleEvent::WarningStarted { .. }));

        // Primeiro tick: ~59s restantes
        match next_event(&mut events).await {
            IdleEvent::CountdownTick { remaining } => {
                assert!(remaining <= Duration::from_secs(59));
                assert!(remaining > Duration::from_secs(57));
            }
            other => panic!("esperava CountdownTick, veio {:?}", other),
        }
    }
}
