use axum::{
    routing::{get, post},
    Router,
    response::Html,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::{api, AppState};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Dashboard page
        .route("/", get(serve_dashboard))
        // API endpoints
        .route("/api/health", get(api::health_check))
        .route("/api/snapshot", get(api::get_snapshot))
        .route("/api/trades", get(api::get_trades))
        .route("/api/stats", get(api::get_stats))
        .route("/api/pairs", get(api::get_pairs))
        .route("/api/profiles", get(api::get_profiles))
        // Wizard endpoints
        .route("/api/config", post(api::post_config))
        .route("/api/wizard", post(api::post_wizard))
        // Control endpoints
        .route("/api/control/start", post(api::post_start))
        .route("/api/control/pause", post(api::post_pause))
        .route("/api/control/withdraw", post(api::post_withdraw))
        .route("/api/control/reset", post(api::post_reset))
        // Tools
        .route("/api/tools/position-size", post(api::post_position_size))
        // WebSocket
        .route("/ws", get(api::websocket_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_dashboard_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("Dashboard server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Simulated Trading Bot</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #0f1419;
            color: #e7e9ea;
            min-height: 100vh;
        }
        .header {
            background: #16202a;
            padding: 1rem 2rem;
            border-bottom: 1px solid #2f3336;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        .header h1 { font-size: 1.5rem; color: #1da1f2; }
        .status { display: flex; align-items: center; gap: 0.5rem; }
        .status-dot { width: 10px; height: 10px; border-radius: 50%; background: #f4212e; }
        .status-dot.connected { background: #00ba7c; }
        .banner { background: #3a2f00; color: #ffd400; padding: 0.5rem 2rem; font-size: 0.85rem; }
        .container { padding: 1.5rem; max-width: 1400px; margin: 0 auto; }
        .grid { display: grid; gap: 1.5rem; grid-template-columns: repeat(3, 1fr); margin-bottom: 1.5rem; }
        @media (max-width: 1000px) { .grid { grid-template-columns: 1fr; } }
        .card { background: #16202a; border-radius: 12px; padding: 1.5rem; border: 1px solid #2f3336; }
        .card h2 { font-size: 1rem; color: #71767b; margin-bottom: 1rem; }
        label { display: block; font-size: 0.85rem; color: #71767b; margin: 0.5rem 0 0.25rem; }
        select, input { width: 100%; padding: 0.5rem; background: #0f1419; color: #e7e9ea; border: 1px solid #2f3336; border-radius: 6px; }
        button { padding: 0.5rem 1rem; border: none; border-radius: 6px; background: #1da1f2; color: white; cursor: pointer; margin: 0.75rem 0.25rem 0 0; }
        button.warn { background: #f4212e; }
        button:disabled { opacity: 0.4; cursor: default; }
        .stat { display: flex; justify-content: space-between; padding: 0.3rem 0; }
        .positive { color: #00ba7c; }
        .negative { color: #f4212e; }
        .error { color: #f4212e; font-size: 0.85rem; min-height: 1.2rem; margin-top: 0.5rem; }
        .big { font-size: 2rem; font-weight: bold; }
        table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
        th, td { text-align: left; padding: 0.35rem; border-bottom: 1px solid #2f3336; }
        .log { max-height: 320px; overflow-y: auto; font-family: monospace; font-size: 0.8rem; }
        .log div { padding: 0.15rem 0; }
        .log .profit { color: #00ba7c; }
        .log .loss { color: #f4212e; }
    </style>
</head>
<body>
    <div class="header">
        <h1>Simulated Trading Bot</h1>
        <div class="status"><span id="dot" class="status-dot"></span><span id="state">Unconfigured</span></div>
    </div>
    <div class="banner">Simulation only. No real orders are placed and no funds are moved.</div>
    <div class="container">
        <div class="grid">
            <div class="card">
                <h2>Setup</h2>
                <label for="pair">Trading pair</label>
                <select id="pair"></select>
                <label for="profile">Risk profile</label>
                <select id="profile"></select>
                <label for="capital">Simulated capital (min 100)</label>
                <input id="capital" value="1000">
                <div id="config-error" class="error"></div>
                <button id="apply">Apply</button>
                <div>
                    <button id="start">Start</button>
                    <button id="pause">Pause</button>
                    <button id="withdraw">Withdraw</button>
                    <button id="reset" class="warn">Reset</button>
                </div>
            </div>
            <div class="card">
                <h2>Statistics</h2>
                <div class="stat"><span>Total P&amp;L</span><span id="pnl">+0.00%</span></div>
                <div class="stat"><span>Profit</span><span id="profit">$0.00</span></div>
                <div class="stat"><span>Win rate</span><span id="winrate">0.00%</span></div>
                <div class="stat"><span>Wins / Losses</span><span id="wl">0 / 0</span></div>
                <div class="stat"><span>Cycles</span><span id="cycles">0</span></div>
                <div class="stat"><span>Risk metric</span><span id="metric">0.00</span></div>
            </div>
            <div class="card">
                <h2>Volatility</h2>
                <div class="big" id="vol">--</div>
                <div id="regime"></div>
                <div id="comment" style="color:#71767b;margin-top:0.5rem"></div>
                <div style="margin-top:1rem">Next sample in <span id="countdown">--</span>s</div>
                <h2 style="margin-top:1.5rem">Position size</h2>
                <label for="balance">Balance</label>
                <input id="balance" value="2000">
                <label for="riskpct">Risk %</label>
                <input id="riskpct" value="1.5">
                <button id="calc">Calculate</button>
                <div id="calc-result"></div>
            </div>
        </div>
        <div class="grid" style="grid-template-columns: 2fr 1fr;">
            <div class="card">
                <h2>Trades</h2>
                <table>
                    <thead><tr><th>#</th><th>Pair</th><th>Side</th><th>Size</th><th>Entry</th><th>Exit</th><th>P&amp;L</th></tr></thead>
                    <tbody id="trades"></tbody>
                </table>
            </div>
            <div class="card">
                <h2>Activity</h2>
                <div class="log" id="logs"></div>
            </div>
        </div>
    </div>
    <script>
        const $ = (id) => document.getElementById(id);
        const pct = (v) => { const n = parseFloat(v); return (n >= 0 ? '+' : '') + n.toFixed(2) + '%'; };
        const cls = (v) => parseFloat(v) >= 0 ? 'positive' : 'negative';

        async function post(url, body) {
            const res = await fetch(url, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: body ? JSON.stringify(body) : undefined,
            });
            return { ok: res.ok, body: await res.json() };
        }

        function renderStats(s) {
            $('pnl').textContent = pct(s.total_pnl_percent);
            $('pnl').className = cls(s.total_pnl_percent);
            $('profit').textContent = '$' + parseFloat(s.total_profit_absolute).toFixed(2);
            $('winrate').textContent = parseFloat(s.win_rate).toFixed(2) + '%';
            $('wl').textContent = s.wins + ' / ' + s.losses;
            $('cycles').textContent = s.cycles;
            $('metric').textContent = parseFloat(s.derived_risk_metric).toFixed(2);
        }

        function renderVolatility(r) {
            if (!r) { $('vol').textContent = '--'; $('regime').textContent = ''; $('comment').textContent = ''; return; }
            $('vol').textContent = parseFloat(r.value).toFixed(1) + '%';
            $('regime').textContent = r.regime;
            $('comment').textContent = r.comment;
        }

        function renderState(state) {
            $('state').textContent = state;
            $('start').disabled = state === 'Running';
            $('pause').disabled = state !== 'Running';
        }

        function renderTrades(trades) {
            $('trades').innerHTML = trades.map(t => `<tr>
                <td>${t.cycle}</td><td>${t.pair}</td><td>${t.side}</td><td>${t.size}</td>
                <td>${t.entry_price}</td><td>${t.exit_price}</td>
                <td class="${cls(t.profit_percent)}">${pct(t.profit_percent)}</td></tr>`).join('');
        }

        function renderLogs(logs) {
            $('logs').innerHTML = logs.map(l =>
                `<div class="${l.kind}">[${new Date(l.timestamp).toLocaleTimeString()}] ${l.message}</div>`).join('');
        }

        function renderSnapshot(s) {
            renderState(s.state);
            renderStats(s.stats);
            renderVolatility(s.volatility);
            $('countdown').textContent = s.countdown ?? '--';
            renderTrades(s.trades);
            renderLogs(s.logs);
        }

        async function refresh() {
            const res = await fetch('/api/snapshot');
            if (res.ok) renderSnapshot(await res.json());
        }

        function connect() {
            const ws = new WebSocket(`${location.protocol === 'https:' ? 'wss' : 'ws'}://${location.host}/ws`);
            ws.onopen = () => $('dot').classList.add('connected');
            ws.onclose = () => { $('dot').classList.remove('connected'); setTimeout(connect, 2000); };
            ws.onmessage = (msg) => {
                const ev = JSON.parse(msg.data);
                switch (ev.type) {
                    case 'initial': renderSnapshot(ev.snapshot); break;
                    case 'StateChanged': renderState(ev.state); break;
                    case 'StatisticsUpdated': renderStats(ev.stats); break;
                    case 'VolatilityUpdated': renderVolatility(ev.reading); break;
                    case 'CountdownTick': $('countdown').textContent = ev.seconds_remaining; break;
                    case 'ConfigurationRejected': $('config-error').textContent = capitalHint(ev.error); break;
                    case 'ConfigurationApplied': $('config-error').textContent = ''; break;
                    case 'WithdrawConfirmed':
                        alert('Withdrawn simulated profit: $' + parseFloat(ev.withdrawn.total_profit_absolute).toFixed(2));
                        break;
                    default: refresh();
                }
            };
        }

        async function loadCatalog() {
            const pairs = await (await fetch('/api/pairs')).json();
            $('pair').innerHTML = pairs.map(p => `<option value="${p.pair}">${p.pair}</option>`).join('');
            const profiles = await (await fetch('/api/profiles')).json();
            $('profile').innerHTML = profiles.map(p =>
                `<option value="${p.profile}" ${p.profile === 'balanced' ? 'selected' : ''}>${p.name} (${p.risk_level})</option>`).join('');
        }

        function capitalHint(error) {
            return error && error.kind === 'CapitalTooLarge'
                ? 'Enter a capital of at most ' + error.maximum + '.'
                : 'Enter a capital of at least 100.';
        }

        function draft() {
            return { pair: $('pair').value, risk_profile: $('profile').value, capital: $('capital').value };
        }

        $('apply').onclick = async () => {
            const res = await post('/api/config', draft());
            if (!res.ok) $('config-error').textContent = capitalHint(res.body.details);
        };
        $('start').onclick = async () => { await post('/api/wizard', draft()); await post('/api/control/start'); };
        $('pause').onclick = () => post('/api/control/pause');
        $('withdraw').onclick = () => post('/api/control/withdraw');
        $('reset').onclick = () => post('/api/control/reset');
        $('calc').onclick = async () => {
            const res = await post('/api/tools/position-size', {
                balance: parseFloat($('balance').value), risk_pct: parseFloat($('riskpct').value),
            });
            $('calc-result').textContent = res.ok ? res.body.message : res.body.error;
        };

        loadCatalog().then(refresh);
        connect();
    </script>
</body>
</html>
"##;
