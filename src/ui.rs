use crate::page::{
    escape_html, PageData, CHART_ID, MONTHLY_COUNT_ID, PROXY_DATA_ID, REGISTRATION_ID,
    TOTAL_COUNT_ID,
};
use crate::stats::StatsView;
use crate::theme::{ThemePreferences, BACKGROUND_CLASS};

pub fn render_index(page: &PageData, prefs: &ThemePreferences, view: &StatsView) -> String {
    let (background_rule, body_class) = match &prefs.background {
        Some(uri) => (format!("--custom-bg-image: url('{uri}');"), BACKGROUND_CLASS),
        None => (String::new(), ""),
    };
    let days = view
        .days_since_registration
        .map(|days| days.to_string())
        .unwrap_or_else(|| "--".to_string());
    // `</` must not appear inside the script element.
    let proxy_data = page
        .text(PROXY_DATA_ID)
        .map(|json| {
            format!(
                r#"<script id="{PROXY_DATA_ID}" type="application/json">{}</script>"#,
                json.replace("</", "<\\/")
            )
        })
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{OPACITY}}", &prefs.opacity.to_string())
        .replace("{{BLUR}}", &prefs.blur_px.to_string())
        .replace("{{BG_RULE}}", &background_rule)
        .replace("{{BODY_CLASS}}", body_class)
        .replace("{{OPACITY_PERCENT}}", &((prefs.opacity * 100.0).round() as u32).to_string())
        .replace("{{MONTHLY_ATTRS}}", &page.attributes_html(MONTHLY_COUNT_ID))
        .replace("{{MONTHLY}}", &view.monthly_emails.to_string())
        .replace("{{TOTAL_ATTRS}}", &page.attributes_html(TOTAL_COUNT_ID))
        .replace("{{TOTAL}}", &view.total_emails.to_string())
        .replace("{{REG_ATTRS}}", &page.attributes_html(REGISTRATION_ID))
        .replace("{{DAYS}}", &escape_html(&days))
        .replace("{{CHART_ATTRS}}", &page.attributes_html(CHART_ID))
        .replace("{{PROXY_DATA}}", &proxy_data)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Daily Reporter</title>
  <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
  <style>
    :root {
      --acrylic-bg-opacity: {{OPACITY}};
      --acrylic-blur: {{BLUR}}px;
      {{BG_RULE}}
      --ink: #1f2933;
      --accent: #0078d7;
      --shadow: 0 24px 60px rgba(15, 40, 70, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, #dfe9f3, #ffffff 60%, #e8eef7 100%);
      background-size: cover;
      background-attachment: fixed;
      color: var(--ink);
      font-family: "Segoe UI", "Microsoft YaHei", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    body.custom-bg {
      background-image: var(--custom-bg-image, linear-gradient(135deg, #dfe9f3, #ffffff));
    }

    .app {
      width: min(920px, 100%);
      background: rgba(255, 255, 255, var(--acrylic-bg-opacity));
      backdrop-filter: blur(var(--acrylic-blur));
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 24px;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat {
      background: rgba(255, 255, 255, 0.7);
      border-radius: 16px;
      padding: 16px;
      display: grid;
      gap: 6px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #6b7785;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent);
    }

    .chart-card {
      height: 260px;
      background: rgba(255, 255, 255, 0.7);
      border-radius: 16px;
      padding: 12px;
    }

    .controls {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 12px;
      align-items: center;
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    button:disabled {
      opacity: 0.5;
      cursor: default;
    }

    .content-display {
      min-height: 120px;
      background: rgba(255, 255, 255, 0.8);
      border-radius: 16px;
      padding: 16px;
      line-height: 1.6;
    }

    .alert {
      border-radius: 12px;
      padding: 10px 14px;
      margin: 8px 0;
    }

    .alert-info { background: #e3f0fb; }
    .alert-success { background: #e3f6ea; color: #1f6b3a; }
    .alert-danger { background: #fbe4e2; color: #a4281b; }
  </style>
</head>
<body class="{{BODY_CLASS}}">
  <main class="app">
    <header>
      <h1>Daily Reporter</h1>
    </header>

    <section class="panel">
      <div class="stat">
        <span class="label">Reports this month</span>
        <span id="monthly-emails-count" class="value"{{MONTHLY_ATTRS}}>{{MONTHLY}}</span>
      </div>
      <div class="stat">
        <span class="label">Reports total</span>
        <span id="total-emails-count" class="value"{{TOTAL_ATTRS}}>{{TOTAL}}</span>
      </div>
      <div class="stat">
        <span class="label">Days since registration</span>
        <span id="days-since-registration" class="value"{{REG_ATTRS}}>{{DAYS}}</span>
      </div>
    </section>

    <section class="chart-card">
      <canvas id="emailMonthlyChart"{{CHART_ATTRS}}></canvas>
    </section>

    <section class="card-body">
      <div class="controls">
        <input type="date" id="report-date" />
        <button id="process-with-gemini" type="button">Generate summary</button>
        <button id="send-email" type="button">Send report</button>
      </div>
      <div class="content-display"></div>
    </section>

    <section class="controls">
      <label>Opacity <input type="range" id="opacity-slider" min="0" max="100" value="{{OPACITY_PERCENT}}" />
        <span id="opacity-value">{{OPACITY_PERCENT}}%</span></label>
      <label>Blur <input type="range" id="blur-slider" min="0" max="40" value="{{BLUR}}" />
        <span id="blur-value">{{BLUR}}px</span></label>
      <input type="file" id="bg-image-input" accept="image/*" />
      <button id="reset-bg" type="button">Reset background</button>
    </section>
  </main>
  {{PROXY_DATA}}

  <script>
    const root = document.documentElement;
    const display = document.querySelector('.content-display');
    const cardBody = document.querySelector('.card-body');
    const sendButton = document.getElementById('send-email');
    const dateInput = document.getElementById('report-date');
    dateInput.value = new Date().toISOString().slice(0, 10);

    const applyUpdate = (update) => {
      for (const change of update.changes || []) {
        if (change.op === 'set_property') root.style.setProperty(change.name, change.value);
        if (change.op === 'remove_property') root.style.removeProperty(change.name);
        if (change.op === 'add_body_class') document.body.classList.add(change.class);
        if (change.op === 'remove_body_class') document.body.classList.remove(change.class);
      }
      if (update.sliders) {
        document.getElementById('opacity-slider').value = update.sliders.opacity_percent;
        document.getElementById('opacity-value').textContent = update.sliders.opacity_label;
        document.getElementById('blur-slider').value = update.sliders.blur_px;
        document.getElementById('blur-value').textContent = update.sliders.blur_label;
      }
    };

    const postTheme = async (path, init) => {
      const res = await fetch(path, { method: 'POST', ...init });
      const body = await res.json();
      if (!res.ok) {
        alert(body.message);
        return;
      }
      applyUpdate(body);
    };

    const postJson = (path, value) => postTheme(path, {
      headers: { 'content-type': 'application/json' },
      body: JSON.stringify({ value: Number(value) })
    });

    document.getElementById('opacity-slider').addEventListener('input', (event) => {
      postJson('/api/theme/opacity', event.target.value);
    });
    document.getElementById('blur-slider').addEventListener('input', (event) => {
      postJson('/api/theme/blur', event.target.value);
    });
    document.getElementById('bg-image-input').addEventListener('change', (event) => {
      const file = event.target.files[0];
      if (!file) return;
      if (file.size > 5 * 1024 * 1024) {
        alert('image must not exceed 5MB');
        event.target.value = '';
        return;
      }
      postTheme('/api/theme/background', {
        headers: { 'content-type': file.type },
        body: file
      });
    });
    document.getElementById('reset-bg').addEventListener('click', () => {
      postTheme('/api/theme/reset', {});
    });

    fetch('/api/stats')
      .then((res) => res.json())
      .then((stats) => {
        if (stats.chart) new Chart(document.getElementById('emailMonthlyChart'), stats.chart);
      })
      .catch((err) => console.error(err));

    const banner = (kind, html, id) => {
      const el = document.createElement('div');
      el.className = `alert alert-${kind}`;
      if (id) el.id = id;
      el.innerHTML = html;
      cardBody.appendChild(el);
      return el;
    };

    const csrfToken = () => {
      const match = document.cookie.split(';').map((c) => c.trim()).find((c) => c.startsWith('csrftoken='));
      return match ? decodeURIComponent(match.slice('csrftoken='.length)) : '';
    };

    const processWithClientProxy = async (payload) => {
      const loading = banner('info', 'Calling Gemini from this browser...');
      try {
        const url = `https://generativelanguage.googleapis.com/v1beta/models/${payload.model}:generateContent?key=${payload.api_key}`;
        const res = await fetch(url, {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ contents: [{ parts: [{ text: payload.prompt }] }] })
        });
        const data = await res.json();
        if (!res.ok) throw new Error((data.error && data.error.message) || 'unknown error');
        const text = data.candidates[0]?.content?.parts[0]?.text || '';
        const cleaned = await fetch('/api/cleanup', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify({ text })
        }).then((r) => r.json());
        display.innerHTML = cleaned.processed_content;
      } catch (err) {
        banner('danger', `client proxy processing failed: ${err.message}`);
        display.innerHTML = payload.original_content;
      } finally {
        loading.remove();
      }
    };

    const embeddedPayload = () => {
      const el = document.getElementById('client-proxy-data');
      if (!el) return null;
      try {
        return JSON.parse(el.textContent);
      } catch (err) {
        console.error('failed to parse client proxy data', err);
        return null;
      }
    };

    document.getElementById('process-with-gemini').addEventListener('click', async () => {
      const embedded = embeddedPayload();
      if (embedded && embedded.use_client_proxy && embedded.date === dateInput.value) {
        await processWithClientProxy(embedded);
        return;
      }
      try {
        const res = await fetch(`/reporter/extract/?date=${dateInput.value}`);
        const body = await res.json();
        if (!res.ok) throw new Error(body.message);
        if (body.mode === 'server') {
          if (body.error) banner('danger', body.error);
          display.innerHTML = body.processed_content;
        } else {
          await processWithClientProxy(body.payload);
        }
      } catch (err) {
        banner('danger', err.message);
      }
    });

    sendButton.addEventListener('click', async () => {
      const sending = banner('info', 'Sending report...', 'email-sending');
      sendButton.disabled = true;
      try {
        const res = await fetch(`/reporter/send-report/?date=${dateInput.value}`, {
          method: 'POST',
          headers: {
            'X-Requested-With': 'XMLHttpRequest',
            'Content-Type': 'application/json',
            'X-CSRFToken': csrfToken()
          },
          body: JSON.stringify({ processed_content: display.innerHTML })
        });
        const data = await res.json();
        sending.remove();
        banner(data.success ? 'success' : 'danger', data.message);
      } catch (err) {
        sending.remove();
        banner('danger', 'server did not respond while sending the report');
      } finally {
        sendButton.disabled = false;
      }
    });
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{CHART_DATA_ATTR, COUNT_ATTR};
    use crate::stats::render_stats;
    use chrono::Utc;

    fn prefs(background: Option<&str>) -> ThemePreferences {
        ThemePreferences {
            opacity: 0.65,
            blur_px: 9,
            background: background.map(str::to_string),
        }
    }

    #[test]
    fn page_carries_data_attributes_and_theme_variables() {
        let mut page = PageData::new();
        page.set_attr(MONTHLY_COUNT_ID, COUNT_ATTR, "4")
            .set_attr(CHART_ID, CHART_DATA_ATTR, r#"[{"day":"1","count":4}]"#);
        let view = render_stats(&page, Utc::now());

        let html = render_index(&page, &prefs(None), &view);
        assert!(html.contains(r#"id="monthly-emails-count" class="value" data-count="4">4<"#));
        assert!(html.contains("data-chart-data=\"[{&quot;day&quot;"));
        assert!(html.contains("--acrylic-bg-opacity: 0.65;"));
        assert!(html.contains("--acrylic-blur: 9px;"));
        assert!(html.contains(r#"<span id="opacity-value">65%</span>"#));
        assert!(html.contains(r#"<body class="">"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn stored_background_sets_class_and_variable() {
        let page = PageData::new();
        let view = render_stats(&page, Utc::now());
        let html = render_index(&page, &prefs(Some("data:image/png;base64,AAAA")), &view);
        assert!(html.contains("--custom-bg-image: url('data:image/png;base64,AAAA');"));
        assert!(html.contains(r#"<body class="custom-bg">"#));
    }

    #[test]
    fn proxy_data_is_embedded_safely() {
        let mut page = PageData::new();
        page.set_text(PROXY_DATA_ID, r#"{"prompt":"</script>"}"#);
        let view = render_stats(&page, Utc::now());
        let html = render_index(&page, &prefs(None), &view);
        assert!(html.contains(r#"<script id="client-proxy-data" type="application/json">{"prompt":"<\/script>"}</script>"#));
    }

    #[test]
    fn process_button_reads_embedded_payload() {
        let html = render_index(&PageData::new(), &prefs(None), &render_stats(&PageData::new(), Utc::now()));
        assert!(html.contains("document.getElementById('client-proxy-data')"));
        assert!(html.contains("embedded.date === dateInput.value"));
        assert!(!html.contains(r#"<script id="client-proxy-data""#));
    }
}
