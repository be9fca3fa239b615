pub fn render_index(balance_cents: i64, currency: &str, transaction_count: usize) -> String {
    INDEX_HTML
        .replace("{{BALANCE}}", &format_cents(balance_cents))
        .replace("{{CURRENCY}}", currency)
        .replace("{{COUNT}}", &transaction_count.to_string())
}

pub fn format_cents(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let magnitude = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Wallet Funding</title>
  <link rel="stylesheet" href="/assets/app.css" />
</head>
<body>
  <main class="shell">
    <header class="masthead">
      <div>
        <h1>Wallet Funding</h1>
        <p class="tagline">Simulated deposits, local ledger, works offline.</p>
      </div>
      <span class="badge" id="network-badge">online</span>
    </header>

    <section class="cards">
      <article class="card balance-card">
        <span class="label">Available balance</span>
        <span class="value" id="balance">{{CURRENCY}} {{BALANCE}}</span>
        <button class="btn-fund" id="fund-btn" type="button">Add funds</button>
      </article>
      <article class="card">
        <span class="label">Transactions</span>
        <span class="value" id="tx-count">{{COUNT}}</span>
      </article>
      <article class="card">
        <span class="label">7-day change</span>
        <span class="value" id="trend-delta">--</span>
      </article>
    </section>

    <section class="card chart-section">
      <div class="section-head">
        <h2>Balance, last 7 days</h2>
        <span class="muted" id="trend-range"></span>
      </div>
      <svg id="trend-chart" viewBox="0 0 640 240" role="img" aria-label="Rolling balance trend"></svg>
    </section>

    <section class="card history-section">
      <div class="section-head">
        <h2>Transaction history</h2>
      </div>
      <table>
        <thead>
          <tr><th>When</th><th>Reference</th><th class="num">Amount</th></tr>
        </thead>
        <tbody id="history-body">
          <tr><td colspan="3" class="muted">Loading&hellip;</td></tr>
        </tbody>
      </table>
    </section>

    <div class="status" id="status"></div>
  </main>

  <div class="widget-backdrop" id="widget-backdrop" hidden>
    <div class="widget" role="dialog" aria-modal="true" aria-labelledby="widget-title">
      <h3 id="widget-title">PayLane Checkout</h3>
      <p class="muted">Hosted payment widget (simulated). Nothing is charged.</p>
      <label for="widget-amount">Amount ({{CURRENCY}})</label>
      <input id="widget-amount" type="number" min="0.01" step="0.01" value="25.00" />
      <div class="widget-actions">
        <button class="btn-fund" id="widget-pay" type="button">Pay</button>
        <button class="btn-ghost" id="widget-cancel" type="button">Cancel</button>
      </div>
    </div>
  </div>

  <noscript><p class="status">This dashboard needs JavaScript for the chart and deposits.</p></noscript>
  <script src="/assets/app.js"></script>
</body>
</html>
"#;
